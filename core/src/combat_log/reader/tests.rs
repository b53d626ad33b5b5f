use super::*;
use std::io::Write;

const DAMAGE: &str = "0|CombatMsg_Damage|a|b|c|d|e|Spear|1|Odin|f|Ymir|100|10";

fn line(outcome: ReadOutcome) -> (u64, String) {
    match outcome {
        ReadOutcome::Line { line_number, text } => (line_number, text),
        other => panic!("expected a line, got {other:?}"),
    }
}

#[tokio::test]
async fn test_tail_reads_lines_then_reports_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, "first\r\n\nsecond\n").unwrap();

    let mut reader = Reader::open(path.clone(), 0, 0).await.unwrap();
    assert_eq!(line(reader.next_line().await.unwrap()), (1, "first".to_string()));
    // blank line 2 is skipped but still counted
    assert_eq!(line(reader.next_line().await.unwrap()), (3, "second".to_string()));
    assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::NoData);
    assert_eq!(reader.position(), 15);
}

#[tokio::test]
async fn test_tail_holds_partial_line_until_newline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, "par").unwrap();

    let mut reader = Reader::open(path.clone(), 0, 0).await.unwrap();
    assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::NoData);

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"tial\n").unwrap();
    file.flush().unwrap();

    assert_eq!(line(reader.next_line().await.unwrap()), (1, "partial".to_string()));
}

#[tokio::test]
async fn test_tail_reports_removed_file_as_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, "only\n").unwrap();

    let mut reader = Reader::open(path.clone(), 0, 0).await.unwrap();
    line(reader.next_line().await.unwrap());
    std::fs::remove_file(&path).unwrap();

    assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Lost);
}

#[tokio::test]
async fn test_tail_resumes_from_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, "one\ntwo\n").unwrap();

    let mut reader = Reader::open(path, 4, 1).await.unwrap();
    assert_eq!(line(reader.next_line().await.unwrap()), (2, "two".to_string()));
}

#[test]
fn test_read_existing_keeps_file_order_and_skips_partial_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    let mut content = String::new();
    for i in 0..50 {
        content.push_str(&DAMAGE.replace("|1|Odin", &format!("|{i}|Odin")));
        content.push('\n');
    }
    content.push_str("0|CombatMsg_Damage|unterminated");
    std::fs::write(&path, &content).unwrap();

    let catch_up = Reader::read_existing(&path, &LogParser::new()).unwrap();

    assert_eq!(catch_up.events.len(), 50);
    assert_eq!(catch_up.line_count, 50);
    assert_eq!(catch_up.end_pos, content.rfind('\n').unwrap() as u64 + 1);
    let timestamps: Vec<f64> = catch_up
        .events
        .iter()
        .map(|e| e.as_ref().unwrap().timestamp().unwrap())
        .collect();
    let expected: Vec<f64> = (0..50).map(|i| i as f64).collect();
    assert_eq!(timestamps, expected);
}

#[test]
fn test_read_existing_surfaces_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, format!("{DAMAGE}\n0|CombatMsg_Damage|short\n")).unwrap();

    let catch_up = Reader::read_existing(&path, &LogParser::new()).unwrap();
    assert!(catch_up.events[0].is_ok());
    assert!(matches!(
        catch_up.events[1],
        Err(ParseError::MalformedLine { line_number: 2, .. })
    ));
}

#[test]
fn test_read_existing_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("CombatLog_1.log");
    std::fs::write(&path, "").unwrap();

    let catch_up = Reader::read_existing(&path, &LogParser::new()).unwrap();
    assert!(catch_up.events.is_empty());
    assert_eq!(catch_up.end_pos, 0);
}

#[test]
fn test_decode_bytes_falls_back_to_windows_1252() {
    assert_eq!(decode_bytes(b"Odin\r\n"), "Odin");
    assert_eq!(decode_bytes(b"Caf\xe9\n"), "Café");
}
