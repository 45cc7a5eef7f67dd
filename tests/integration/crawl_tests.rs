//! Integration tests for the crawl pipeline
//!
//! These tests use wiremock for the target host and a small shell script
//! standing in for the fetch agent. The script records its arguments and
//! drops a prepared raw archive where the real agent would write one.

#![cfg(unix)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use warc_harvest::config::{
    CrawlRequest, CrawlRequestBuilder, FetchAgentConfig, NetworkConfig, Settings,
};
use warc_harvest::crawler::{run_pipeline, ExitStatus};
use warc_harvest::state::PipelineState;
use warc_harvest::warc::{ArchiveReader, RawRecord};
use warc_harvest::HarvestError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MANIFEST_URI: &str = "metadata://gnu.org/software/wget/warc/MANIFEST.txt";

/// Serializes one raw WARC record the way the fetch agent writes it,
/// target URI in angle brackets
fn raw_record(record_type: &str, uri: Option<&str>, content_type: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!("WARC/1.0\r\nWARC-Type: {}\r\n", record_type);
    if let Some(uri) = uri {
        out.push_str(&format!("WARC-Target-URI: <{}>\r\n", uri));
    }
    out.push_str(&format!(
        "Content-Type: {}\r\nContent-Length: {}\r\n\r\n",
        content_type,
        block.len()
    ));
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(block);
    bytes.extend_from_slice(b"\r\n\r\n");
    bytes
}

fn response_record(uri: &str, body: &str) -> Vec<u8> {
    let block = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    raw_record(
        "response",
        Some(uri),
        "application/http;msgtype=response",
        block.as_bytes(),
    )
}

/// A typical agent run: warcinfo, one page, the agent's own metadata
fn typical_raw_archive(origin: &str) -> Vec<u8> {
    let mut bytes = raw_record(
        "warcinfo",
        None,
        "application/warc-fields",
        b"software: Wget/1.21\r\nformat: WARC File Format 1.0\r\n",
    );
    bytes.extend(response_record(
        &format!("{}/", origin),
        "<html><body>hello</body></html>",
    ));
    bytes.extend(raw_record(
        "resource",
        Some(MANIFEST_URI),
        "text/plain",
        b"site.warc\n",
    ));
    bytes
}

const HELP_WITH_NO_COMPRESSION: &str =
    "  --warc-file=FILENAME   save request/response data to a .warc.gz file\n  --no-warc-compression  do not compress WARC files with GZIP";
const HELP_WITHOUT_NO_COMPRESSION: &str =
    "  --warc-file=FILENAME   save request/response data to a .warc.gz file";

struct FakeAgent {
    program: PathBuf,
    args_log: PathBuf,
}

impl FakeAgent {
    /// Agent that supports `--no-warc-compression` and leaves `fixture` as
    /// the uncompressed `<base>.warc`; `tail` runs afterwards
    fn install(dir: &Path, fixture: Option<&[u8]>, tail: &str) -> Self {
        let copy = match fixture {
            Some(bytes) => {
                let fixture_path = dir.join("fixture.warc");
                std::fs::write(&fixture_path, bytes).unwrap();
                format!("cp '{}' \"$base.warc\"", fixture_path.display())
            }
            None => String::new(),
        };
        Self::write_script(dir, HELP_WITH_NO_COMPRESSION, &copy, tail)
    }

    /// Agent without `--no-warc-compression`: it compresses `fixture` itself
    /// and leaves it as `<base>.warc.gz`
    fn install_compressing(dir: &Path, fixture: Option<&[u8]>, tail: &str) -> Self {
        let copy = match fixture {
            Some(bytes) => {
                let fixture_path = dir.join("fixture.warc.gz");
                std::fs::write(&fixture_path, gzip(bytes)).unwrap();
                format!("cp '{}' \"$base.warc.gz\"", fixture_path.display())
            }
            None => String::new(),
        };
        Self::write_script(dir, HELP_WITHOUT_NO_COMPRESSION, &copy, tail)
    }

    fn write_script(dir: &Path, help: &str, copy: &str, tail: &str) -> Self {
        let program = dir.join("fake-wget");
        let args_log = dir.join("agent-args.txt");

        let script = format!(
            r#"#!/bin/sh
if [ "$1" = "--help" ]; then
  printf '%s\n' '{help}'
  exit 0
fi
echo "$@" > '{log}'
base=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--warc-file" ]; then base="$2"; fi
  shift
done
{copy}
{tail}
"#,
            help = help,
            log = args_log.display(),
            copy = copy,
            tail = tail,
        );
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { program, args_log }
    }

    fn settings(&self) -> Settings {
        Settings {
            fetch_agent: FetchAgentConfig {
                program: self.program.to_string_lossy().into_owned(),
                ..FetchAgentConfig::default()
            },
            network: NetworkConfig {
                probe_timeout_secs: 5,
                robots_timeout_secs: 5,
                ..NetworkConfig::default()
            },
        }
    }

    fn was_invoked(&self) -> bool {
        self.args_log.exists()
    }

    fn args(&self) -> String {
        std::fs::read_to_string(&self.args_log).unwrap()
    }
}

async fn start_host(robots: Option<&str>) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let robots_response = match robots {
        Some(body) => ResponseTemplate::new(200).set_body_string(body),
        None => ResponseTemplate::new(404),
    };
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(robots_response)
        .mount(&server)
        .await;

    server
}

/// Request for `origin` writing into `dir/mirror` and `dir/site.warc.gz`
fn request_builder(origin: &str, dir: &Path) -> CrawlRequestBuilder {
    CrawlRequest::builder(origin, dir.join("mirror"), dir.join("site.warc.gz"))
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn read_archive(path: &Path) -> Vec<RawRecord> {
    ArchiveReader::open(path)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[tokio::test]
async fn test_full_crawl_filters_agent_metadata() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install(dir.path(), Some(&fixture), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.final_state, PipelineState::Done);
    assert_eq!(report.outcome.unwrap().status, ExitStatus::Success);

    let stats = report.rewrite.unwrap();
    assert_eq!(stats.records_read, 3);
    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.dropped_no_uri, 1);
    assert_eq!(stats.dropped_metadata, 1);
    assert!(!stats.corrupted);

    let records = read_archive(&dir.path().join("site.warc.gz"));
    assert_eq!(records.len(), 1);
    let expected_uri = format!("{}/", server.uri());
    assert_eq!(records[0].target_uri(), Some(expected_uri.as_str()));

    // Raw archive is removed once rewritten
    assert!(!dir.path().join("site.warc").exists());
}

#[tokio::test]
async fn test_agent_compressed_archive_is_rewritten() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install_compressing(dir.path(), Some(&fixture), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert!(!agent.args().contains("--no-warc-compression"));
    assert_eq!(report.final_state, PipelineState::Done);

    let stats = report.rewrite.unwrap();
    assert_eq!(stats.records_read, 3);
    assert_eq!(stats.records_written, 1);
    assert_eq!(stats.dropped_metadata, 1);

    let archive = dir.path().join("site.warc.gz");
    assert!(std::fs::metadata(&archive).unwrap().len() > 0);
    assert_eq!(read_archive(&archive).len(), 1);
    assert!(!dir.path().join("site.warc").exists());
}

#[tokio::test]
async fn test_stale_archive_not_mistaken_for_agent_output() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let stale = typical_raw_archive("http://old.example");
    std::fs::write(dir.path().join("site.warc.gz"), gzip(&stale)).unwrap();
    let agent = FakeAgent::install_compressing(dir.path(), None, "exit 4");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.rewrite.unwrap().records_read, 0);
    assert_eq!(
        std::fs::metadata(dir.path().join("site.warc.gz")).unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_agent_invocation_carries_request_options() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install(dir.path(), Some(&fixture), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .user_agent("TestBot/1.0")
        .file_types("html,pdf")
        .build()
        .unwrap();

    run_pipeline(agent.settings(), &request).await.unwrap();

    let args = agent.args();
    assert!(args.starts_with("--mirror"));
    assert!(args.contains("-A html,pdf"));
    assert!(args.contains("--user-agent TestBot/1.0"));
    assert!(args.contains(&format!("--warc-file {}", dir.path().join("site").display())));
    assert!(args.trim_end().ends_with("--no-warc-compression"));
    assert!(!args.contains("--wait"));
}

#[tokio::test]
async fn test_robots_crawl_delay_raises_wait() {
    let server = start_host(Some("User-agent: *\nCrawl-delay: 5\nDisallow: /private\n")).await;
    let dir = TempDir::new().unwrap();
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install(dir.path(), Some(&fixture), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .wait_seconds(2)
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.effective_wait, Some(5));
    assert!(agent.args().contains("--wait 5"));
}

#[tokio::test]
async fn test_smaller_crawl_delay_keeps_caller_wait() {
    let server = start_host(Some("Crawl-delay: 1\n")).await;
    let dir = TempDir::new().unwrap();
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install(dir.path(), Some(&fixture), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .wait_seconds(3)
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.effective_wait, Some(3));
    assert!(agent.args().contains("--wait 3"));
}

#[tokio::test]
async fn test_unreachable_host_gets_empty_archive_without_agent() {
    let dir = TempDir::new().unwrap();
    let agent = FakeAgent::install(dir.path(), None, "exit 0");

    let request = CrawlRequest::builder(
        "http://127.0.0.1:9",
        dir.path().join("mirror"),
        dir.path().join("out/site.warc.gz"),
    )
    .build()
    .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.final_state, PipelineState::Done);
    assert!(report.outcome.is_none());
    assert!(!agent.was_invoked());

    let archive = dir.path().join("out/site.warc.gz");
    assert_eq!(std::fs::metadata(&archive).unwrap().len(), 0);
    assert!(read_archive(&archive).is_empty());
}

#[tokio::test]
async fn test_partial_crawl_is_still_rewritten() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    // wget exit code 8: server issued an error response for some pages
    let fixture = typical_raw_archive(&server.uri());
    let agent = FakeAgent::install(dir.path(), Some(&fixture), "exit 8");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    let outcome = report.outcome.unwrap();
    assert_eq!(outcome.status, ExitStatus::PartialFailure);
    assert_eq!(outcome.exit_code, Some(8));
    assert_eq!(report.rewrite.unwrap().records_written, 1);
}

#[tokio::test]
async fn test_timed_out_crawl_is_still_rewritten() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let agent = FakeAgent::install(
        dir.path(),
        Some(&typical_raw_archive(&server.uri())),
        "exec sleep 30",
    );

    let request = request_builder(&server.uri(), dir.path())
        .time_limit("1s")
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.final_state, PipelineState::Done);
    assert_eq!(report.outcome.unwrap().status, ExitStatus::TimedOut);
    assert_eq!(read_archive(&dir.path().join("site.warc.gz")).len(), 1);
    assert!(!dir.path().join("site.warc").exists());
}

#[tokio::test]
async fn test_truncated_raw_archive_keeps_complete_records() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();

    let mut raw = response_record(&format!("{}/", server.uri()), "<p>first</p>");
    raw.extend(response_record(&format!("{}/second", server.uri()), "<p>second</p>"));
    raw.extend_from_slice(
        b"WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: <http://cut.example/>\r\nContent-Length: 500\r\n\r\nHTTP/1.1 2",
    );
    let agent = FakeAgent::install(dir.path(), Some(&raw), "exit 4");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    let stats = report.rewrite.unwrap();
    assert!(stats.corrupted);
    assert_eq!(stats.records_written, 2);

    let records = read_archive(&dir.path().join("site.warc.gz"));
    assert_eq!(records.len(), 2);
    assert!(records[1].target_uri().unwrap().ends_with("/second"));
}

#[tokio::test]
async fn test_non_ascii_response_header_is_repaired() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();

    let block = "HTTP/1.1 200 OK\r\nX-Title: caf\u{e9}\r\n\r\nbody".as_bytes();
    let raw = raw_record(
        "response",
        Some(&format!("{}/", server.uri())),
        "application/http;msgtype=response",
        block,
    );
    let agent = FakeAgent::install(dir.path(), Some(&raw), "exit 0");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();
    assert_eq!(report.rewrite.unwrap().headers_repaired, 1);

    let records = read_archive(&dir.path().join("site.warc.gz"));
    assert_eq!(records.len(), 1);
    let http = records[0].http_headers.as_ref().unwrap();
    assert!(http.to_ascii_bytes().is_ok());
    assert_eq!(http.status_code().as_deref(), Some("200"));
    assert_eq!(records[0].payload, b"body".to_vec());
}

#[tokio::test]
async fn test_agent_that_writes_nothing_gives_empty_archive() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();
    let agent = FakeAgent::install(dir.path(), None, "exit 4");

    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let report = run_pipeline(agent.settings(), &request).await.unwrap();

    assert_eq!(report.final_state, PipelineState::Done);
    assert_eq!(report.rewrite.unwrap().records_written, 0);
    assert!(dir.path().join("site.warc.gz").exists());
}

#[tokio::test]
async fn test_missing_agent_aborts_request() {
    let server = start_host(None).await;
    let dir = TempDir::new().unwrap();

    let settings = Settings {
        fetch_agent: FetchAgentConfig {
            program: dir.path().join("no-such-wget").to_string_lossy().into_owned(),
            ..FetchAgentConfig::default()
        },
        ..Settings::default()
    };
    let request = request_builder(&server.uri(), dir.path())
        .build()
        .unwrap();

    let result = run_pipeline(settings, &request).await;

    assert!(matches!(result, Err(HarvestError::Launch { .. })));
    assert!(!dir.path().join("site.warc.gz").exists());
}
