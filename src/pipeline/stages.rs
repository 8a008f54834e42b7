//! Command lines for the external converters.

use std::path::Path;
use std::time::Duration;

use daopub_common::ComponentId;

use crate::config::ToolsConfig;
use crate::state::ComponentPaths;
use crate::tools::ToolCommand;

/// Which image roots the converter reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConverterInputs {
    /// Include the archival (tiff) directory.
    pub archival: bool,
    /// Include the already published PDF.
    pub pdf: bool,
}

/// Pre-METS converter:
/// `--output OUT --input IMAGES [--input TIFFS] [--input PDF] --objid ID --docid URL`.
pub fn pre_mets_command(
    tools: &ToolsConfig,
    paths: &ComponentPaths,
    id: &ComponentId,
    inputs: ConverterInputs,
    output: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::from_spec("converter", &tools.converter);
    cmd.timeout(Duration::from_secs(tools.timeout_secs))
        .arg("--output")
        .arg_path(output)
        .arg("--input")
        .arg_path(&paths.image_dir);
    if inputs.archival {
        cmd.arg("--input").arg_path(&paths.archival_dir);
    }
    if inputs.pdf {
        cmd.arg("--input").arg_path(&paths.pdf);
    }
    cmd.arg("--objid")
        .arg(id.to_string())
        .arg("--docid")
        .arg(paths.mets_url.clone());
    cmd
}

/// METS transform: `-xsl:STYLESHEET -s:PRE -o:OUT title=TITLE`.
///
/// The title is one argv element; no shell quoting is involved.
pub fn transform_command(
    tools: &ToolsConfig,
    paths: &ComponentPaths,
    title: &str,
    output: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::from_spec("xslt", &tools.xslt.tool());
    cmd.timeout(Duration::from_secs(tools.timeout_secs))
        .arg(format!("-xsl:{}", tools.xslt.stylesheet.display()))
        .arg(format!("-s:{}", paths.pre_mets.display()))
        .arg(format!("-o:{}", output.display()))
        .arg(format!("title={title}"));
    cmd
}

/// PDF assembler: `-o OUT IMAGE_DIR`, reading the archival masters when
/// `archival` is set and the derivatives otherwise.
pub fn pdf_command(
    tools: &ToolsConfig,
    paths: &ComponentPaths,
    archival: bool,
    output: &Path,
) -> ToolCommand {
    let source = if archival {
        &paths.archival_dir
    } else {
        &paths.image_dir
    };
    let mut cmd = ToolCommand::from_spec("pdf", &tools.pdf);
    cmd.timeout(Duration::from_secs(tools.timeout_secs))
        .arg("-o")
        .arg_path(output)
        .arg_path(source);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ToolSpec};
    use std::path::PathBuf;

    fn fixture() -> (Config, ComponentPaths, ComponentId) {
        let mut config = Config::default();
        config.stores.image_store = PathBuf::from("/jp2s");
        config.stores.archival_store = PathBuf::from("/tiffs");
        config.stores.mets_root = PathBuf::from("/mets");
        config.tools.converter = ToolSpec::new("python", &["dao.py"]);
        config.tools.pdf = ToolSpec::new("bash", &["dirtopdf.sh", "-d", "-s", "3200"]);
        let id: ComponentId = "C0022/c0031".parse().unwrap();
        let paths = ComponentPaths::new(&config, &id);
        (config, paths, id)
    }

    #[test]
    fn converter_arguments() {
        let (config, paths, id) = fixture();
        let cmd = pre_mets_command(
            &config.tools,
            &paths,
            &id,
            ConverterInputs {
                archival: true,
                pdf: false,
            },
            &paths.pre_mets,
        );
        assert_eq!(
            cmd.argv(),
            vec![
                "python",
                "dao.py",
                "--output",
                "/jp2s/C0022/c0031.xml",
                "--input",
                "/jp2s/C0022/c0031",
                "--input",
                "/tiffs/C0022/c0031",
                "--objid",
                "C0022/c0031",
                "--docid",
                "http://findingaids.princeton.edu/folders/C0022/c0031.mets",
            ]
        );
    }

    #[test]
    fn converter_can_take_the_pdf() {
        let (config, paths, id) = fixture();
        let cmd = pre_mets_command(
            &config.tools,
            &paths,
            &id,
            ConverterInputs {
                archival: false,
                pdf: true,
            },
            Path::new("/jp2s/C0022/.tmp-x-c0031.xml"),
        );
        let argv = cmd.argv();
        let pos = argv.iter().position(|a| a == "/jp2s/C0022/c0031.pdf").unwrap();
        assert_eq!(argv[pos - 1], "--input");
        assert_eq!(argv[3], "/jp2s/C0022/.tmp-x-c0031.xml");
    }

    #[test]
    fn transform_title_is_a_single_argument() {
        let (config, paths, _) = fixture();
        let cmd = transform_command(
            &config.tools,
            &paths,
            "Letters; rm -rf / $(x): 1920",
            &paths.mets,
        );
        let argv = cmd.argv();
        assert_eq!(argv.last().unwrap(), "title=Letters; rm -rf / $(x): 1920");
        assert!(argv.contains(&"-s:/jp2s/C0022/c0031.xml".to_string()));
        assert!(argv.contains(&"-o:/mets/C0022/c0031.mets".to_string()));
        assert!(argv.contains(&"-xsl:lib/folder2mets.xsl".to_string()));
    }

    #[test]
    fn pdf_reads_archival_masters() {
        let (config, paths, _) = fixture();
        assert_eq!(
            pdf_command(&config.tools, &paths, true, &paths.pdf).argv(),
            vec![
                "bash",
                "dirtopdf.sh",
                "-d",
                "-s",
                "3200",
                "-o",
                "/jp2s/C0022/c0031.pdf",
                "/tiffs/C0022/c0031",
            ]
        );
        assert_eq!(
            pdf_command(&config.tools, &paths, false, &paths.pdf)
                .argv()
                .last()
                .unwrap(),
            "/jp2s/C0022/c0031"
        );
    }
}
