/*!
 * End-to-end campaign runs over the fake archive tool and the mock backend.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use w3translate::errors::{ArchiveError, PipelineError};
use w3translate::pipeline::{MapStatus, PipelineStage, ProgressCallback, RunProgress};
use w3translate::protection::ProtectionState;
use w3translate::providers::mock::MockProvider;
use w3translate::string_table::StringTable;
use w3translate::{Language, SyncMode};

use crate::common::{FakeArchiveTool, archive_text, create_temp_dir, pack, test_translator, unpack, write_campaign, wts};

const SCRIPT: &str = r#"function Trig_Stat takes nothing returns nothing
    if LoadStr(udg_HT, 0, 1) == "攻击力" then
        call BJDebugMsg("TRIGSTR_001")
    endif
endfunction
"#;

fn clean_map() -> Vec<u8> {
    pack(&[
        ("war3map.j", SCRIPT.as_bytes().to_vec()),
        ("war3map.wts", wts(&[(1, "攻击力"), (2, "攻击力+10"), (3, "欢迎")]).into_bytes()),
        ("war3mapMisc.txt", "Label=攻击力\n".as_bytes().to_vec()),
    ])
}

fn protected_map() -> Vec<u8> {
    pack(&[("war3map.wts", wts(&[(1, "攻击力"), (2, "再见")]).into_bytes())])
}

fn campaign(base: &Path) -> PathBuf {
    let input_dir = base.join("input");
    fs::create_dir_all(&input_dir).unwrap();
    write_campaign(
        &input_dir,
        "Campaign.w3n",
        &[
            ("war3campaign.wts", wts(&[(1, "第一章"), (2, "攻击力")]).into_bytes()),
            ("Chapter1.w3x", clean_map()),
            ("Chapter2.w3x", protected_map()),
            ("(listfile)", b"war3campaign.wts\r\nChapter1.w3x\r\nChapter2.w3x\r\n".to_vec()),
        ],
    )
}

fn table_of(archive: &[u8], name: &str) -> StringTable {
    StringTable::parse(&unpack(archive)[name]).unwrap()
}

fn leftover_workspaces(base: &Path) -> usize {
    fs::read_dir(base)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
        .count()
}

#[tokio::test]
async fn test_translateCampaign_withProtectedMap_shouldTranslateEverythingConsistently() {
    let temp = create_temp_dir().unwrap();
    let input = campaign(temp.path());
    let original = fs::read(&input).unwrap();
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::varying());

    let outcome = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Synchronize)
        .await
        .unwrap();

    // backup is byte-identical and the input is untouched
    assert_eq!(fs::read(&outcome.backup_path).unwrap(), original);
    assert_eq!(fs::read(&input).unwrap(), original);
    assert!(outcome.backup_path.starts_with(temp.path().join("backup")));

    let translated = fs::read(&outcome.translated_path).unwrap();
    assert!(outcome.translated_path.starts_with(temp.path().join("translated")));

    let campaign_table = table_of(&translated, "war3campaign.wts");
    assert_eq!(campaign_table.ids(), vec![1, 2]);
    let canonical = campaign_table.get(2).unwrap().to_string();
    assert!(canonical.starts_with("[en] 攻击力"));

    let chapter1 = unpack(&translated)["Chapter1.w3x"].clone();
    let table = table_of(&chapter1, "war3map.wts");
    assert_eq!(table.ids(), vec![1, 2, 3]);
    assert_eq!(table.get(1), Some(canonical.as_str()));
    assert_eq!(table.get(2).unwrap(), format!("{}+10", canonical));
    assert!(table.get(3).unwrap().starts_with("[en] 欢迎"));
    assert!(archive_text(&chapter1, "war3map.j").contains(&format!("== \"{}\"", canonical)));
    assert!(archive_text(&chapter1, "war3map.j").contains("\"TRIGSTR_001\""));
    assert_eq!(archive_text(&chapter1, "war3mapMisc.txt"), format!("Label={}\n", canonical));

    let chapter2 = unpack(&translated)["Chapter2.w3x"].clone();
    assert_eq!(table_of(&chapter2, "war3map.wts").get(1), Some(canonical.as_str()));

    assert_eq!(outcome.protected_map_paths.len(), 1);
    let protected = &outcome.protected_map_paths[0];
    assert!(protected.starts_with(temp.path().join("protected")));
    assert!(protected.ends_with("Chapter2.w3x"));
    assert_eq!(fs::read(protected).unwrap(), chapter2);

    let report = &outcome.report;
    assert!(!report.is_degraded());
    assert_eq!(report.maps.len(), 2);
    assert_eq!(report.maps[0].protection, Some(ProtectionState::Clean));
    assert_eq!(report.maps[1].protection, Some(ProtectionState::Protected));
    assert!(report.maps.iter().all(|m| m.status == MapStatus::Translated));
    assert_eq!(report.stage_trace().last(), Some(&PipelineStage::Done));
    assert_eq!(leftover_workspaces(temp.path()), 0);
}

#[tokio::test]
async fn test_translateCampaign_withMapRepackFailure_shouldKeepThatMapVerbatim() {
    let temp = create_temp_dir().unwrap();
    let input = campaign(temp.path());
    let tool = FakeArchiveTool::failing_repack("Chapter2.w3x");
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let outcome = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Synchronize)
        .await
        .unwrap();

    let translated = fs::read(&outcome.translated_path).unwrap();
    assert_eq!(unpack(&translated)["Chapter2.w3x"], protected_map());
    assert_eq!(
        table_of(&unpack(&translated)["Chapter1.w3x"], "war3map.wts").get(1),
        Some("[en] 攻击力")
    );

    let report = &outcome.report;
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].map, "Chapter2.w3x");
    assert_eq!(report.warnings[0].stage, PipelineStage::RepackMap);
    assert_eq!(report.degraded_maps(), vec!["Chapter2.w3x"]);
    assert!(report.summary().contains("Chapter2.w3x kept original (repack map)"));
    assert!(outcome.protected_map_paths.is_empty());
    assert_eq!(leftover_workspaces(temp.path()), 0);
}

#[tokio::test]
async fn test_translateCampaign_withMapExtractionFailure_shouldContinueWithOtherMaps() {
    let temp = create_temp_dir().unwrap();
    let input = campaign(temp.path());
    let tool = FakeArchiveTool::failing_extract("Chapter1.w3x");
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let outcome = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Synchronize)
        .await
        .unwrap();

    let translated = fs::read(&outcome.translated_path).unwrap();
    assert_eq!(unpack(&translated)["Chapter1.w3x"], clean_map());
    assert_eq!(outcome.report.warnings[0].stage, PipelineStage::ExtractMap);
    assert_eq!(outcome.report.maps[1].status, MapStatus::Translated);
}

#[tokio::test]
async fn test_translateCampaign_withMalformedMapTable_shouldWarnAndKeepMap() {
    let temp = create_temp_dir().unwrap();
    let input_dir = temp.path().join("input");
    fs::create_dir_all(&input_dir).unwrap();
    let broken = pack(&[
        ("war3map.j", SCRIPT.as_bytes().to_vec()),
        ("war3map.wts", b"STRING 1\n{\nunterminated\n".to_vec()),
    ]);
    let input = write_campaign(&input_dir, "Campaign.w3n", &[("Broken.w3x", broken.clone())]);
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let outcome = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Preserve)
        .await
        .unwrap();

    let translated = fs::read(&outcome.translated_path).unwrap();
    assert_eq!(unpack(&translated)["Broken.w3x"], broken);
    assert_eq!(outcome.report.warnings[0].stage, PipelineStage::TranslateMapTable);
    assert!(!tool.calls().contains(&"repack 001_Broken.w3x".to_string()));
}

#[tokio::test]
async fn test_translateCampaign_withUnavailableTool_shouldAbortAfterBackup() {
    let temp = create_temp_dir().unwrap();
    let input = campaign(temp.path());
    let tool = FakeArchiveTool::unavailable();
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let err = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Synchronize)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Archive(ArchiveError::ToolUnavailable(_))));
    assert_eq!(fs::read_dir(temp.path().join("backup")).unwrap().count(), 1);
    assert!(!temp.path().join("translated").exists());
    assert_eq!(leftover_workspaces(temp.path()), 0);
}

#[tokio::test]
async fn test_translateCampaign_withMissingInput_shouldFailBeforeBackup() {
    let temp = create_temp_dir().unwrap();
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let err = translator
        .translate_campaign(
            &temp.path().join("missing.w3n"),
            Language::Chinese,
            Language::English,
            SyncMode::Synchronize,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InputNotFound(_)));
    assert!(!temp.path().join("backup").exists());
    assert!(tool.calls().is_empty());
}

#[tokio::test]
async fn test_translateCampaignWithProgress_shouldReportEveryMap() {
    let temp = create_temp_dir().unwrap();
    let input = campaign(temp.path());
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());
    let events: Arc<Mutex<Vec<RunProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let on_progress = move |progress: RunProgress| sink.lock().push(progress);

    translator
        .translate_campaign_with_progress(
            &input,
            Language::Chinese,
            Language::English,
            SyncMode::Synchronize,
            Some(&on_progress as &ProgressCallback),
        )
        .await
        .unwrap();

    let events = events.lock();
    let maps: Vec<&str> = events
        .iter()
        .filter(|e| e.stage == PipelineStage::ExtractMap)
        .filter_map(|e| e.map.as_deref())
        .collect();
    assert_eq!(maps, vec!["Chapter1.w3x", "Chapter2.w3x"]);
    let last = events.last().unwrap();
    assert_eq!(last.stage, PipelineStage::Done);
    assert_eq!((last.maps_done, last.maps_total), (2, 2));
}

#[tokio::test]
async fn test_translateCampaign_withCampaignStringUsedByMapScript_shouldAgreeEverywhere() {
    let temp = create_temp_dir().unwrap();
    let input_dir = temp.path().join("input");
    fs::create_dir_all(&input_dir).unwrap();
    let script = "function Trig_Crit takes nothing returns nothing\n    if LoadStr(udg_HT, 0, 1) == \"暴击\" then\n    endif\nendfunction\n";
    let with_table = pack(&[
        ("war3map.j", script.as_bytes().to_vec()),
        ("war3map.wts", wts(&[(1, "暴击")]).into_bytes()),
    ]);
    let script_only = pack(&[("war3map.j", "call BJDebugMsg(\"暴击\")\n".as_bytes().to_vec())]);
    let input = write_campaign(
        &input_dir,
        "Campaign.w3n",
        &[
            ("war3campaign.wts", wts(&[(1, "暴击")]).into_bytes()),
            ("M.w3x", with_table),
            ("N.w3x", script_only),
        ],
    );
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::varying());

    let outcome = translator
        .translate_campaign(&input, Language::Chinese, Language::English, SyncMode::Synchronize)
        .await
        .unwrap();

    let translated = fs::read(&outcome.translated_path).unwrap();
    let canonical = table_of(&translated, "war3campaign.wts").get(1).unwrap().to_string();
    assert!(canonical.starts_with("[en] 暴击"));

    let map = unpack(&translated)["M.w3x"].clone();
    assert_eq!(table_of(&map, "war3map.wts").get(1), Some(canonical.as_str()));
    assert!(archive_text(&map, "war3map.j").contains(&format!("== \"{}\"", canonical)));

    let script_only = unpack(&translated)["N.w3x"].clone();
    assert_eq!(
        archive_text(&script_only, "war3map.j"),
        format!("call BJDebugMsg(\"{}\")\n", canonical)
    );
    assert_eq!(outcome.report.maps[1].status, MapStatus::Translated);
    assert_eq!(outcome.report.identifiers, 1);
}

#[tokio::test]
async fn test_translateCampaign_withRussianSource_shouldKeepWindows1251Table() {
    let temp = create_temp_dir().unwrap();
    let input_dir = temp.path().join("input");
    fs::create_dir_all(&input_dir).unwrap();
    let binding = wts(&[(1, "Привет")]);
    let (table, _, _) = encoding_rs::WINDOWS_1251.encode(&binding);
    let input = write_campaign(&input_dir, "Campaign.w3n", &[("war3campaign.wts", table.into_owned())]);
    let tool = FakeArchiveTool::new();
    let translator = test_translator(temp.path(), &tool, &MockProvider::working());

    let outcome = translator
        .translate_campaign(&input, Language::Russian, Language::English, SyncMode::Synchronize)
        .await
        .unwrap();

    let translated = fs::read(&outcome.translated_path).unwrap();
    let campaign_table = StringTable::parse_for(&unpack(&translated)["war3campaign.wts"], Language::Russian).unwrap();
    assert_eq!(campaign_table.get(1), Some("[en] Привет"));
    assert_eq!(campaign_table.encoding(), encoding_rs::WINDOWS_1251);
}
