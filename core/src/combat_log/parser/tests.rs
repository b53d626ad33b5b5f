use super::*;

fn piped(kind: &str, reason: &str, time: &str, source: &str, target: &str, amount: &str, mitigated: &str) -> String {
    format!("0|{kind}|a|b|c|d|e|{reason}|{time}|{source}|f|{target}|{amount}|{mitigated}")
}

fn braced(kind: &str, reason: &str, time: &str, source: &str, target: &str, amount: &str, mitigated: &str) -> String {
    format!(
        r#",{{"id":"0","eventType":"{kind}","a":"a","b":"b","c":"c","d":"d","e":"e","reason":"{reason}","time":"{time}","source":"{source}","f":"f","target":"{target}","value1":"{amount}","value2":"{mitigated}"}}"#
    )
}

// classification
#[test]
fn test_parse_damage_kinds() {
    let parser = LogParser::new();
    for kind in ["CombatMsg_Damage", "CombatMsg_CritDamage", "CombatMsg_Backstab", "CombatMsg_HolyCrit"] {
        let line = piped(kind, "Lightning Spear", "12.5", "Odin", "Fenrir", "120", "30");
        let event = parser.parse_line(1, &line).unwrap();
        assert!(matches!(event, CombatEvent::Damage(_)), "{kind} should be damage");
    }
}

#[test]
fn test_parse_damage_fields() {
    let parser = LogParser::new();
    let line = piped("CombatMsg_Damage", "Lightning Spear", "12.5", "Odin", "Fenrir", "120", "30");
    let CombatEvent::Damage(hit) = parser.parse_line(7, &line).unwrap() else {
        panic!("expected damage");
    };

    assert_eq!(hit.line_number, 7);
    assert_eq!(hit.timestamp, 12.5);
    assert_eq!(hit.source, "Odin");
    assert_eq!(hit.target, "Fenrir");
    assert_eq!(hit.reason, "Lightning Spear");
    assert_eq!(hit.amount, 120);
    assert_eq!(hit.secondary, 30);
}

#[test]
fn test_parse_heal_without_secondary() {
    let parser = LogParser::new();
    let line = "0|CombatMsg_Healing|a|b|c|d|e|Purification Beads|3|Guan Yu|f|Odin|55";
    let CombatEvent::Heal(hit) = parser.parse_line(1, line).unwrap() else {
        panic!("expected heal");
    };

    assert_eq!(hit.amount, 55);
    assert_eq!(hit.secondary, 0);
    assert_eq!(hit.target, "Odin");
}

#[test]
fn test_parse_crowd_control() {
    let parser = LogParser::new();
    for kind in ["CombatMsg_Status", "CombatMsg_CrowdControl"] {
        let line = format!("0|{kind}|a|b|c|d|e|Recall|4|Odin");
        let CombatEvent::CrowdControl(cc) = parser.parse_line(1, &line).unwrap() else {
            panic!("expected crowd control for {kind}");
        };
        assert_eq!(cc.source, "Odin");
        assert_eq!(cc.target, "");
    }
}

#[test]
fn test_parse_unrecognized_kinds() {
    let parser = LogParser::new();
    for kind in ["CombatMsg_Kill", "Damage", "Combat_Msg_Damage", "CombatMsg_damage"] {
        let line = piped(kind, "x", "1", "Odin", "Ymir", "1", "0");
        assert_eq!(parser.parse_line(1, &line).unwrap(), CombatEvent::Unrecognized, "{kind}");
    }
}

#[test]
fn test_parse_unrecognized_short_line_is_not_an_error() {
    let parser = LogParser::new();
    assert_eq!(parser.parse_line(1, "0|Chat_Msg|hello").unwrap(), CombatEvent::Unrecognized);
}

#[test]
fn test_parse_end_sentinels() {
    let parser = LogParser::new();
    assert_eq!(parser.parse_line(1, "end").unwrap(), CombatEvent::EndOfLog);
    assert_eq!(
        parser.parse_line(1, r#",{"eventType":"end"}"#).unwrap(),
        CombatEvent::EndOfLog
    );
}

// malformed input
#[test]
fn test_parse_damage_missing_mitigated_field() {
    let parser = LogParser::new();
    let line = "0|CombatMsg_Damage|a|b|c|d|e|Spear|3|Odin|f|Ymir|90";
    let err = parser.parse_line(4, line).unwrap_err();
    assert!(matches!(
        err,
        ParseError::MalformedLine { line_number: 4, fields: 13, needed: 14 }
    ));
}

#[test]
fn test_parse_single_field_line() {
    let parser = LogParser::new();
    assert!(matches!(
        parser.parse_line(2, "garbage"),
        Err(ParseError::MalformedLine { needed: 2, .. })
    ));
}

#[test]
fn test_parse_invalid_timestamp() {
    let parser = LogParser::new();
    let line = piped("CombatMsg_Damage", "x", "noon", "Odin", "Ymir", "1", "0");
    assert!(matches!(
        parser.parse_line(9, &line),
        Err(ParseError::InvalidTimestamp { line_number: 9, .. })
    ));
}

#[test]
fn test_parse_game_datetime_timestamp() {
    let parser = LogParser::new();
    let early = piped("CombatMsg_Damage", "x", "2024.03.01-18.22.05", "Odin", "Ymir", "1", "0");
    let late = piped("CombatMsg_Damage", "x", "2024.03.01-18.22.07.500", "Odin", "Ymir", "1", "0");

    let early = parser.parse_line(1, &early).unwrap().timestamp().unwrap();
    let late = parser.parse_line(2, &late).unwrap().timestamp().unwrap();
    assert!((late - early - 2.5).abs() < 1e-6);
}

#[test]
fn test_parse_unparsable_amount_counts_as_zero() {
    let parser = LogParser::new();
    let line = piped("CombatMsg_Damage", "x", "1", "Odin", "Ymir", "lots", "");
    let CombatEvent::Damage(hit) = parser.parse_line(1, &line).unwrap() else {
        panic!("expected damage");
    };
    assert_eq!(hit.amount, 0);
    assert_eq!(hit.secondary, 0);
}

// dialects
#[test]
fn test_parse_dialects_agree() {
    let parser = LogParser::new();
    let args = ("CombatMsg_CritDamage", "Ragnarok", "41.25", "Odin", "Gold Fury", "812", "94");

    let a = parser
        .parse_line(3, &braced(args.0, args.1, args.2, args.3, args.4, args.5, args.6))
        .unwrap();
    let b = parser
        .parse_line(3, &piped(args.0, args.1, args.2, args.3, args.4, args.5, args.6))
        .unwrap();

    assert_eq!(a, b);
    assert!(matches!(a, CombatEvent::Damage(_)));
}

#[test]
fn test_parse_piped_key_value_fields() {
    let parser = LogParser::new();
    let line = "id=0|type=CombatMsg_Healing|a|b|c|d|e|reason=Heal|time=2|src=Ra|f|tgt=Odin|amount=40";
    let CombatEvent::Heal(hit) = parser.parse_line(1, line).unwrap() else {
        panic!("expected heal");
    };
    assert_eq!(hit.source, "Ra");
    assert_eq!(hit.reason, "Heal");
    assert_eq!(hit.amount, 40);
}
