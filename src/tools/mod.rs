//! External tool invocation and availability checks.

mod command;

pub use command::{ToolCommand, ToolOutput};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;

/// Availability information for a configured tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Role of the tool in the pipeline (converter, xslt, pdf).
    pub name: String,
    /// Whether the program resolved to an executable.
    pub available: bool,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
    /// Leading script or jar argument, when it names a file that is missing.
    pub missing_input: Option<PathBuf>,
}

/// Resolve a program the way the OS would: explicit paths are checked
/// directly, bare names are searched in `PATH`.
pub fn check_tool(name: &str, program: &Path) -> ToolInfo {
    let resolved = if program.components().count() > 1 {
        program.exists().then(|| program.to_path_buf())
    } else {
        which::which(program).ok()
    };

    ToolInfo {
        name: name.to_string(),
        available: resolved.is_some(),
        path: resolved,
        missing_input: None,
    }
}

/// Check every configured tool, plus the script, jar and stylesheet files
/// they are pointed at.
pub fn check_tools(config: &ToolsConfig) -> Vec<ToolInfo> {
    let entries = [
        ("converter", &config.converter.program, config.converter.args.clone()),
        ("xslt", &config.xslt.program, {
            let mut args = config.xslt.args.clone();
            args.push(config.xslt.stylesheet.to_string_lossy().into_owned());
            args
        }),
        ("pdf", &config.pdf.program, config.pdf.args.clone()),
    ];

    entries
        .into_iter()
        .map(|(name, program, args)| {
            let mut info = check_tool(name, program);
            info.missing_input = args
                .iter()
                .filter(|a| !a.starts_with('-'))
                .map(PathBuf::from)
                .filter(|p| looks_like_file(p))
                .find(|p| !p.exists());
            info
        })
        .collect()
}

fn looks_like_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e, "py" | "sh" | "jar" | "xsl" | "xslt"))
        .unwrap_or(false)
}
