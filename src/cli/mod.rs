use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::session::RefineMode;
use crate::wire::{DeviceClass, PageVariant, StylePreset};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openrouter", alias = "open-router")]
    OpenRouter,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Anthropic,
    Ollama,
}

#[derive(Parser, Debug)]
#[command(name = "shopforge", version, about = "Generate storefront pages with an LLM, preview and export them")]
pub struct Args {
    /// TOML config file (defaults to ./shopforge.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Flags win over the file.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(p) = self.provider {
            cfg.provider = p;
        }
        if let Some(m) = &self.model {
            cfg.model = m.clone();
        }
        if let Some(t) = self.timeout_secs {
            cfg.timeout_secs = t;
        }
        if let Some(d) = &self.data_dir {
            cfg.data_dir = d.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a page, or refine the previous one
    Generate(GenerateArgs),
    /// Write the preview file set of the current page to a directory
    Preview(PreviewArgs),
    /// Normalize raw model output from a file (or stdin)
    Normalize {
        file: Option<PathBuf>,
    },
    /// Save the current page to the dashboard
    Save,
    /// List saved pages
    List,
    /// Print a saved page
    Show {
        id: String,
        /// Print the raw source instead of the normalized one
        #[arg(long, default_value_t = false)]
        raw: bool,
    },
    /// Delete a saved page
    Delete {
        id: String,
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Hand a saved page back to the generator
    Open {
        id: String,
    },
    /// Export the current (or a saved) page as a Next.js project zip
    Export {
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
pub struct GenerateArgs {
    /// What to build, or what to change
    #[arg(required = true, num_args = 1..)]
    pub instruction: Vec<String>,

    #[arg(long, value_enum)]
    pub page_type: Option<PageVariant>,

    #[arg(long, value_enum)]
    pub preset: Option<StylePreset>,

    #[arg(long)]
    pub reference_url: Option<String>,

    /// Treat the instruction as a refinement of the current page
    #[arg(long, conflicts_with = "fresh", default_value_t = false)]
    pub refine: bool,

    /// Start over even if the instruction reads like a refinement
    #[arg(long, default_value_t = false)]
    pub fresh: bool,

    #[arg(long, default_value_t = false)]
    pub save_request: bool,

    #[arg(long, default_value_t = false)]
    pub save_response: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub progress: bool,

    /// Also write the preview file set here
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceClass::Desktop)]
    pub device: DeviceClass,
}

impl GenerateArgs {
    pub fn instruction_text(&self) -> String {
        self.instruction.join(" ")
    }

    pub fn refine_mode(&self) -> RefineMode {
        match (self.refine, self.fresh) {
            (true, _) => RefineMode::Refine,
            (_, true) => RefineMode::Fresh,
            _ => RefineMode::Auto,
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct PreviewArgs {
    #[arg(long, default_value = "preview")]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = DeviceClass::Desktop)]
    pub device: DeviceClass,

    /// Preview raw model output from this file instead of the current page
    #[arg(long)]
    pub from: Option<PathBuf>,
}
