// End-to-end runs of the trailgraph binary

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn fixture() -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    write!(
        temp_file,
        r#"{{
            "urls": [{{"url": "https://a.com/"}}, {{"url": "https://b.com/"}}],
            "visits": {{
                "https://a.com/": [{{"visitId": 1}}],
                "https://b.com/": [{{"visitId": 2, "referringVisitId": 1}}]
            }}
        }}"#
    )?;
    Ok(temp_file)
}

#[test]
fn test_json_report_owns_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = fixture()?;

    // No --quiet, so the banner and status lines are printed too
    let output = Command::new(env!("CARGO_BIN_EXE_trailgraph"))
        .args(["graph", "--fixture"])
        .arg(fixture.path())
        .args(["-f", "json"])
        .output()?;

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["report"]["summary"]["total_nodes"], 2);
    assert_eq!(report["report"]["summary"]["total_edges"], 1);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("t r a i l g r a p h"));
    assert!(stderr.contains("Graph complete"));
    Ok(())
}

#[test]
fn test_missing_places_file_still_reports() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::new(env!("CARGO_BIN_EXE_trailgraph"))
        .args(["-q", "graph", "--places", "/nonexistent/places.sqlite", "-f", "csv"])
        .output()?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout)?, "source,target,visit_id\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("History unavailable"));
    Ok(())
}
