//! Shared test harness for integration tests.
//!
//! Provides [`Fixture`], a throwaway set of stores under a temp dir, fake
//! converter scripts that log every invocation, and a mock finding-aids
//! service.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use daopub::config::{Config, ToolSpec, XsltSpec};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

const CONVERTER: &str = r#"out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "<premets/>" > "$out"
"#;

const XSLT: &str = r#"for a in "$@"; do
  case "$a" in
    -o:*) out="${a#-o:}" ;;
  esac
done
echo "<mets/>" > "$out"
"#;

const PDF: &str = r#"out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
echo "%PDF-1.4" > "$out"
"#;

/// Component document served by the mock service.
pub fn component_xml(title: &str, date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<c level="file"><did><unittitle>{title}</unittitle><unitdate>{date}</unitdate></did></c>"#
    )
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
    pub server: MockServer,
    pub log: PathBuf,
}

impl Fixture {
    /// Stores, working fake tools and a collection document for `C0022`
    /// held by repository `mss`.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let log = root.join("tools.log");
        let bin = root.join("bin");
        fs::create_dir_all(&bin).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/C0022.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<ead><archdesc><did><repository id="mss">Manuscripts Division</repository></did></archdesc></ead>"#,
            ))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.stores.image_store = root.join("jp2s");
        config.stores.archival_store = root.join("tiffs");
        config.stores.mets_root = root.join("mets");
        config.stores.ead_root = root.join("eads");
        config.finding_aids.collections_url = format!("{}/collections", server.uri());
        config.finding_aids.folders_url = "http://findingaids.princeton.edu/folders".to_string();
        config.tools.timeout_secs = 30;
        config.tools.converter = ToolSpec::new(write_tool(&bin, "converter", &log, CONVERTER), &[]);
        config.tools.xslt = XsltSpec {
            program: write_tool(&bin, "xslt", &log, XSLT),
            args: Vec::new(),
            stylesheet: PathBuf::from("folder2mets.xsl"),
        };
        config.tools.pdf = ToolSpec::new(write_tool(&bin, "pdf", &log, PDF), &[]);

        Self {
            dir,
            config,
            server,
            log,
        }
    }

    /// Serve the same component document for every component of `C0022`.
    pub async fn serve_all_components(&self, title: &str, date: &str) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/collections/C0022/c[0-9]+\.xml$"))
            .respond_with(ResponseTemplate::new(200).set_body_string(component_xml(title, date)))
            .mount(&self.server)
            .await;
    }

    /// Serve a specific body for one component.
    pub async fn serve_component(&self, name: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(format!("/collections/C0022/{name}.xml")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// A component with `pages` images in both stores.
    pub fn add_component(&self, name: &str, pages: u32) {
        let jp2 = self.config.stores.image_store.join("C0022").join(name);
        let tif = self.config.stores.archival_store.join("C0022").join(name);
        fs::create_dir_all(&jp2).unwrap();
        fs::create_dir_all(&tif).unwrap();
        for n in 1..=pages {
            fs::write(jp2.join(format!("{n:08}.jp2")), b"jp2").unwrap();
            fs::write(tif.join(format!("{n:08}.tif")), b"tif").unwrap();
        }
    }

    /// Finding aid for `C0022` with one `<c>` per component name.
    pub fn write_ead(&self, components: &[&str]) -> PathBuf {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ead xmlns=\"urn:isbn:1-931666-22-9\" xmlns:xlink=\"{XLINK_NS}\">\n<archdesc level=\"collection\"><dsc>\n"
        );
        for name in components {
            xml.push_str(&format!(
                "<c02 id=\"C0022_{name}\" level=\"file\"><did><unittitle>{name}</unittitle></did></c02>\n"
            ));
        }
        xml.push_str("</dsc></archdesc>\n</ead>\n");

        let path = self.ead_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, xml).unwrap();
        path
    }

    pub fn ead_path(&self) -> PathBuf {
        self.config.stores.ead_root.join("mss").join("C0022.EAD.xml")
    }

    /// Replace one fake tool with a script that fails.
    pub fn break_tool(&mut self, tool: &str, stderr: &str, code: i32) {
        self.replace_tool(tool, &format!("echo '{stderr}' >&2\nexit {code}\n"));
    }

    /// Replace one fake tool with a logging script running `body`.
    pub fn replace_tool(&mut self, tool: &str, body: &str) {
        let bin = self.dir.path().join("bin");
        let program = write_tool(&bin, &format!("{tool}-replaced"), &self.log, body);
        match tool {
            "converter" => self.config.tools.converter.program = program,
            "xslt" => self.config.tools.xslt.program = program,
            "pdf" => self.config.tools.pdf.program = program,
            other => panic!("unknown tool {other}"),
        }
    }

    /// Directory entries of the collection in the image store.
    pub fn collection_listing(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.config.stores.image_store.join("C0022"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Logged invocations, one line each.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn pdf(&self, name: &str) -> PathBuf {
        self.config
            .stores
            .image_store
            .join("C0022")
            .join(format!("{name}.pdf"))
    }

    pub fn mets(&self, name: &str) -> PathBuf {
        self.config
            .stores
            .mets_root
            .join("C0022")
            .join(format!("{name}.mets"))
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Write an executable `sh` script that logs `name [arg] [arg]...` before
/// running `body`.
fn write_tool(bin: &Path, name: &str, log: &Path, body: &str) -> PathBuf {
    let path = bin.join(name);
    let script = format!(
        "#!/bin/sh\n{{ printf '%s' '{name}'; printf ' [%s]' \"$@\"; echo; }} >> '{}'\n{body}",
        log.display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
