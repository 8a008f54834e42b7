use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stores: StoresConfig,

    #[serde(default)]
    pub finding_aids: FindingAidsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoresConfig {
    /// Derivative image store: `<image_store>/<callno>/<component>/` plus the
    /// published `<component>.pdf` marker.
    #[serde(default = "default_image_store")]
    pub image_store: PathBuf,

    /// Archival (master tiff) store with the same layout.
    #[serde(default = "default_archival_store")]
    pub archival_store: PathBuf,

    /// Root for transformed METS files.
    #[serde(default = "default_mets_root")]
    pub mets_root: PathBuf,

    /// Root for EAD finding aids: `<ead_root>/<repository>/<callno>.EAD.xml`.
    #[serde(default = "default_ead_root")]
    pub ead_root: PathBuf,

    /// Where pre-METS descriptors are written (defaults to the image store).
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

fn default_image_store() -> PathBuf {
    PathBuf::from("/mnt/libimages/data/jp2s")
}

fn default_archival_store() -> PathBuf {
    PathBuf::from("/mnt/diglibdata/archives")
}

fn default_mets_root() -> PathBuf {
    PathBuf::from("/var/lib/daopub/mets")
}

fn default_ead_root() -> PathBuf {
    PathBuf::from("/var/lib/daopub/eads")
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            image_store: default_image_store(),
            archival_store: default_archival_store(),
            mets_root: default_mets_root(),
            ead_root: default_ead_root(),
            work_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FindingAidsConfig {
    /// Base URL of the finding-aid XML service (`<url>/<id>.xml`).
    #[serde(default = "default_collections_url")]
    pub collections_url: String,

    /// Public base URL that METS files are served from; used for the
    /// converter docid and the DAO href.
    #[serde(default = "default_folders_url")]
    pub folders_url: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_collections_url() -> String {
    "http://findingaids.princeton.edu/collections".to_string()
}

fn default_folders_url() -> String {
    "http://findingaids.princeton.edu/folders".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for FindingAidsConfig {
    fn default() -> Self {
        Self {
            collections_url: default_collections_url(),
            folders_url: default_folders_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

/// An external program plus leading arguments placed before the
/// stage-specific ones.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ToolSpec {
    pub program: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct XsltSpec {
    pub program: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    /// Stylesheet turning a pre-METS descriptor into METS.
    pub stylesheet: PathBuf,
}

impl XsltSpec {
    /// The program and leading arguments, without the stylesheet.
    pub fn tool(&self) -> ToolSpec {
        ToolSpec {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Per-invocation timeout for every external tool.
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Pre-METS converter (`--output --input... --objid --docid`).
    #[serde(default = "default_converter")]
    pub converter: ToolSpec,

    /// XSLT processor (`-xsl: -s: -o: title=`).
    #[serde(default = "default_xslt")]
    pub xslt: XsltSpec,

    /// PDF assembler (`-o <pdf> <image dir>`).
    #[serde(default = "default_pdf")]
    pub pdf: ToolSpec,
}

fn default_tool_timeout() -> u64 {
    3600
}

fn default_converter() -> ToolSpec {
    ToolSpec::new("python", &["bin/dao.py"])
}

fn default_xslt() -> XsltSpec {
    XsltSpec {
        program: PathBuf::from("java"),
        args: vec!["-jar".to_string(), "lib/saxon9he.jar".to_string()],
        stylesheet: PathBuf::from("lib/folder2mets.xsl"),
    }
}

fn default_pdf() -> ToolSpec {
    ToolSpec::new("bash", &["bin/dirtopdf.sh", "-d", "-s", "3200"])
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_tool_timeout(),
            converter: default_converter(),
            xslt: default_xslt(),
            pdf: default_pdf(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Upper bound on components processed at once.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Extension of derivative images in the image store.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Extension of master images in the archival store.
    #[serde(default = "default_archival_extension")]
    pub archival_extension: String,
}

fn default_workers() -> usize {
    4
}

fn default_image_extension() -> String {
    "jp2".to_string()
}

fn default_archival_extension() -> String {
    "tif".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            image_extension: default_image_extension(),
            archival_extension: default_archival_extension(),
        }
    }
}
