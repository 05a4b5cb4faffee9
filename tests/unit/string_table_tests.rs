/*!
 * Tests for the string table codec
 */

use w3translate::errors::FormatError;
use w3translate::Language;
use w3translate::string_table::{StringEntry, StringTable};

const FIXTURE: &str = "\u{feff}STRING 1\r\n// Units: Footman (Name)\r\n{\r\n步兵\r\n}\r\n\r\nSTRING 2\r\n{\r\n第一行\r\n第二行\r\n}\r\n\r\nSTRING 15\r\n{\r\n}\r\n";

#[test]
fn test_parseSerialize_withUntouchedTable_shouldBeByteExact() {
    let table = StringTable::parse(FIXTURE.as_bytes()).unwrap();

    assert_eq!(table.ids(), vec![1, 2, 15]);
    assert_eq!(table.get(2), Some("第一行\r\n第二行"));
    assert_eq!(table.get(15), Some(""));
    assert_eq!(table.serialize(), FIXTURE.as_bytes());
}

#[test]
fn test_setText_shouldPreserveIdsOrderAndLayout() {
    let mut table = StringTable::parse(FIXTURE.as_bytes()).unwrap();
    table.set_text(1, "Footman").unwrap();

    let reparsed = StringTable::parse(&table.serialize()).unwrap();
    assert_eq!(reparsed.ids(), vec![1, 2, 15]);
    assert_eq!(reparsed.get(1), Some("Footman"));
    assert_eq!(reparsed.get(2), table.get(2));
    assert!(String::from_utf8(table.serialize()).unwrap().contains("// Units: Footman (Name)\r\n"));
}

#[test]
fn test_reparse_shouldBeStable() {
    let table = StringTable::parse(FIXTURE.as_bytes()).unwrap();
    let again = StringTable::parse(&table.serialize()).unwrap();
    assert_eq!(again.pairs(), table.pairs());
}

#[test]
fn test_push_shouldUseCanonicalLayout() {
    let mut table = StringTable::default();
    table.push(StringEntry::new(3, "hello")).unwrap();
    table.push(StringEntry::new(4, "world")).unwrap();

    assert_eq!(table.to_text(), "STRING 3\n{\nhello\n}\n\nSTRING 4\n{\nworld\n}\n");
    assert_eq!(
        table.push(StringEntry::new(3, "again")),
        Err(FormatError::DuplicateId { id: 3 })
    );
}

#[test]
fn test_parse_withMalformedInput_shouldReportFormatErrors() {
    let cases: [(&str, fn(&FormatError) -> bool); 5] = [
        ("STRING\n{\nx\n}\n", |e| matches!(e, FormatError::MissingId { .. })),
        ("STRING 1\nx\n}\n", |e| matches!(e, FormatError::UnbalancedBraces { .. })),
        ("STRING 1\n{\nx\n", |e| matches!(e, FormatError::UnbalancedBraces { .. })),
        ("STRING 1\n{\nx\n}\nSTRING 1\n{\ny\n}\n", |e| matches!(e, FormatError::DuplicateId { id: 1 })),
        ("STRING 1\n{\nx\n}\nstray\n", |e| matches!(e, FormatError::UnexpectedLine { .. })),
    ];

    for (input, expected) in cases {
        let err = StringTable::parse(input.as_bytes()).unwrap_err();
        assert!(expected(&err), "unexpected error {:?} for {:?}", err, input);
    }
}

#[test]
fn test_parse_withStrayClosingDelimiter_shouldNotTruncate() {
    let err = StringTable::parse(b"STRING 1\n{\nx\n}}\n}\n").unwrap_err();
    assert!(matches!(err, FormatError::StrayDelimiter { .. }));
}

#[test]
fn test_setText_withDelimiterLine_shouldBeRejected() {
    let mut table = StringTable::parse(FIXTURE.as_bytes()).unwrap();
    assert_eq!(
        table.set_text(1, "line\n}\nmore"),
        Err(FormatError::DelimiterInText { id: 1 })
    );
    assert_eq!(table.set_text(99, "x"), Err(FormatError::UnknownId { id: 99 }));
    assert_eq!(table.get(1), Some("步兵"));
}

#[test]
fn test_parse_withGb18030Table_shouldRoundTripInSameEncoding() {
    let text = "STRING 1\n{\n攻击力提升\n}\n";
    let (bytes, _, _) = encoding_rs::GB18030.encode(text);

    let mut table = StringTable::parse(&bytes).unwrap();
    assert_eq!(table.encoding(), encoding_rs::GB18030);
    assert_eq!(table.get(1), Some("攻击力提升"));
    assert_eq!(table.serialize(), bytes.to_vec());

    table.set_text(1, "攻击").unwrap();
    assert_eq!(table.serialize(), encoding_rs::GB18030.encode("STRING 1\n{\n攻击\n}\n").0.to_vec());
}

#[test]
fn test_parseFor_withWindows1251Table_shouldDecodeCyrillic() {
    let text = "STRING 1\n{\nПривет\n}\n";
    let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(text);

    let mut table = StringTable::parse_for(&bytes, Language::Russian).unwrap();
    assert_eq!(table.encoding(), encoding_rs::WINDOWS_1251);
    assert_eq!(table.get(1), Some("Привет"));
    assert_eq!(table.serialize(), bytes.to_vec());

    table.set_text(1, "Пока").unwrap();
    assert_eq!(table.serialize(), encoding_rs::WINDOWS_1251.encode("STRING 1\n{\nПока\n}\n").0.to_vec());
}

#[test]
fn test_parseFor_withEucKrTable_shouldDecodeHangul() {
    let (bytes, _, _) = encoding_rs::EUC_KR.encode("STRING 3\n{\n공격력\n}\n");

    let table = StringTable::parse_for(&bytes, Language::Korean).unwrap();
    assert_eq!(table.encoding(), encoding_rs::EUC_KR);
    assert_eq!(table.get(3), Some("공격력"));
    assert_eq!(table.serialize(), bytes.to_vec());
}

#[test]
fn test_parseFor_withUtf8Table_shouldIgnoreHint() {
    let table = StringTable::parse_for("STRING 1\n{\nПривет\n}\n".as_bytes(), Language::Chinese).unwrap();
    assert_eq!(table.encoding(), encoding_rs::UTF_8);
    assert_eq!(table.get(1), Some("Привет"));
}
