use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use shopforge::config::Config;
use shopforge::errors::ForgeError;
use shopforge::export::build_archive;
use shopforge::normalize::export_surface;
use shopforge::preview::{assemble, render_preview, DirectorySandbox, COMPONENT_PATH};
use shopforge::prompt::PREVIOUS_CODE_MARKER;
use shopforge::provider::openai::OpenAiCompatible;
use shopforge::provider::{Gateway, Provider};
use shopforge::session::{Generator, RefineMode, SessionState};
use shopforge::store::{HandoffSlot, JsonFileRepository, PageRepository};
use shopforge::wire::{DeviceClass, GenerationRequest, HandoffPayload, PageVariant, SavedPageRecord, StylePreset};

#[derive(Clone, Default)]
struct MockProvider {
    replies: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockProvider {
    fn new(replies: &[&str]) -> Self {
        Self { replies: Arc::new(Mutex::new(replies.iter().map(|s| s.to_string()).collect())), ..Default::default() }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ForgeError> {
        self.prompts.lock().push((system.to_string(), user.to_string()));
        let mut replies = self.replies.lock();
        Ok(if replies.is_empty() { String::new() } else { replies.remove(0) })
    }
}

const FIRST: &str = "Sure! Here you go:\n```jsx\nimport React, { useState } from \"react\";\n\nconst Storefront = () => {\n  const [open, setOpen] = useState(false);\n  return <main onClick={() => setOpen(!open)}>Shoes</main>;\n};\n\nexport default Storefront;\n```\nLet me know if you want changes.";

const SECOND: &str = "```jsx\nfunction Hero() {\n  return <section className=\"text-6xl\">Big</section>;\n}\n\nfunction Storefront() {\n  return <main><Hero /></main>;\n}\n```";

#[tokio::test]
async fn generate_refine_save_reopen_and_export() {
    let data = tempfile::tempdir().unwrap();
    let mock = MockProvider::new(&[FIRST, SECOND]);
    let gateway = Gateway::new(Box::new(mock.clone()), Duration::from_secs(2));
    let mut generator = Generator::new(gateway, SessionState::load(data.path()).unwrap());
    let cancel = CancellationToken::new();

    let first = generator
        .submit(
            GenerationRequest::new("I want a page for selling shoes", PageVariant::Landing)
                .with_preset(Some(StylePreset::Bold)),
            RefineMode::Auto,
            &cancel,
        )
        .await
        .unwrap();
    assert!(!first.is_refinement());
    let normalized = first.result.normalized_source_text();
    assert!(normalized.starts_with("import React from \"react\";\n\nimport { useState } from \"react\";"));
    assert!(normalized.contains("const App = () =>"));
    assert!(!normalized.contains("```"));

    let second = generator
        .submit(GenerationRequest::new("make the hero bigger", PageVariant::Landing), RefineMode::Auto, &cancel)
        .await
        .unwrap();
    assert!(second.is_refinement());
    {
        let prompts = mock.prompts.lock();
        assert!(prompts[1].1.contains(PREVIOUS_CODE_MARKER));
        assert!(prompts[1].1.contains("Sure! Here you go:"));
        assert!(prompts[1].1.ends_with("make the hero bigger"));
    }
    let surface = export_surface(second.result.normalized_source_text());
    assert_eq!(surface.default_exports, vec!["App".to_string()]);
    assert_eq!(surface.base_imports, 1);
    assert!(second.result.normalized_source_text().contains("const App = Storefront;"));

    let state = generator.into_state();
    state.save(data.path()).unwrap();

    let repo = JsonFileRepository::new(data.path(), &Config::default().store_namespace);
    let record = SavedPageRecord::new(&second.request, &second.result, 1_700_000_000_000);
    let id = record.id.clone();
    repo.append(record).unwrap();
    assert_eq!(repo.all().unwrap().len(), 1);

    let slot = HandoffSlot::new(data.path());
    slot.put(&HandoffPayload::from(&repo.get(&id).unwrap().unwrap())).unwrap();
    let mut reopened = SessionState::default();
    reopened.seed(slot.take().unwrap().unwrap());
    assert_eq!(reopened.prior_code(), Some(SECOND));

    let files = assemble(Some(second.result.normalized_source_text()), DeviceClass::Mobile);
    let sandbox_dir = data.path().join("preview");
    render_preview(&DirectorySandbox::new(&sandbox_dir), &files).unwrap();
    assert_eq!(
        fs_err::read_to_string(sandbox_dir.join("App.jsx")).unwrap(),
        files.files[COMPONENT_PATH]
    );

    let zip = build_archive(second.result.normalized_source_text(), PageVariant::Landing).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip)).unwrap();
    let mut component = String::new();
    archive
        .by_name("shopforge-export/app/PageComponent.jsx")
        .unwrap()
        .read_to_string(&mut component)
        .unwrap();
    assert_eq!(component, second.result.normalized_source_text());
}

#[tokio::test]
async fn generator_against_an_http_provider() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"<div>Hello</div>"}}]}"#)
        .create_async()
        .await;

    let cfg = Config { api_base: Some(server.url()), ..Config::default() };
    let provider = OpenAiCompatible::openrouter(&cfg).with_api_key("sk-test");
    let mut generator = Generator::new(Gateway::new(Box::new(provider), Duration::from_secs(5)), SessionState::default());

    let out = generator
        .submit(GenerationRequest::new("hello page", PageVariant::Product), RefineMode::Auto, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        out.result.normalized_source_text(),
        "import React from \"react\";\n\nexport default function App() {\n  return (\n    <>\n      <div>Hello</div>\n    </>\n  );\n}\n"
    );
}

#[tokio::test]
async fn empty_model_output_is_reported_upstream() {
    let mock = MockProvider::new(&[]);
    let mut generator = Generator::new(Gateway::new(Box::new(mock), Duration::from_secs(1)), SessionState::default());
    let err = generator
        .submit(GenerationRequest::new("shoes", PageVariant::Landing), RefineMode::Auto, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Upstream(_)));
    assert!(generator.state().last_result.is_none());
}
