/*!
 * Tests for identifier synchronization across tables and scripts
 */

use w3translate::providers::mock::MockProvider;
use w3translate::string_table::StringTable;
use w3translate::translation::script_scan::{self, ScriptKind, Usage};
use w3translate::translation::synchronizer::rewrite_script;
use w3translate::translation::{
    IdentifierDictionary, IdentifierMapping, IdentifierSynchronizer, ScriptSource,
};
use w3translate::{Language, SyncMode};

use crate::common::{test_engine, wts};

const JASS: &str = r#"globals
    hashtable udg_HT = InitHashtable()
endglobals
/* legacy check: if x == "力量" then */
function Trig_Buy_Actions takes nothing returns nothing
    local string s = LoadStr(udg_HT, 0, StringHash("敏捷"))
    if s == "敏捷" then
        call DisplayTextToPlayer(Player(0), 0, 0, "购买成功：" + "敏捷")
    endif
    call SaveStr(udg_HT, 0, 1, "智力")
endfunction
"#;

#[test]
fn test_scanDependencies_shouldIgnoreBlockComments() {
    let deps = script_scan::scan_dependencies(JASS, ScriptKind::Jass);

    assert!(deps["敏捷"].contains(&Usage::StringHash));
    assert!(deps["敏捷"].contains(&Usage::StringComparison));
    assert!(deps["智力"].contains(&Usage::SaveStrValue));
    assert!(!deps.contains_key("力量"));
}

#[tokio::test]
async fn test_synchronize_everyOccurrenceShouldShareOneTranslation() {
    let mock = MockProvider::varying();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::new();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let script = ScriptSource::new(ScriptKind::Jass, JASS);
    let mut mapping = IdentifierMapping::new();

    let mut first = StringTable::parse(
        wts(&[(1, "敏捷"), (2, "购买敏捷药水"), (3, "智力"), (4, "商店")]).as_bytes(),
    )
    .unwrap();
    let mut second = StringTable::parse(wts(&[(9, "敏捷"), (10, "敏捷与智力")]).as_bytes()).unwrap();

    let report = sync.synchronize(&mut first, Some(&script), &mut mapping).await;
    sync.synchronize(&mut second, Some(&script), &mut mapping).await;

    let agility = mapping.get("敏捷").unwrap().to_string();
    let intellect = mapping.get("智力").unwrap().to_string();
    assert_ne!(agility, intellect);
    assert_eq!(first.get(1), Some(agility.as_str()));
    assert_eq!(first.get(3), Some(intellect.as_str()));
    assert_eq!(second.get(9), Some(agility.as_str()));
    assert!(first.get(2).unwrap().contains(&agility));
    assert!(second.get(10).unwrap().contains(&format!("{}与{}", agility, intellect)));
    assert_eq!(report.identifiers, 2);
    assert_eq!(report.independent_entries, 1);

    let (rewritten, replaced) = rewrite_script(JASS, ScriptKind::Jass, &mapping);
    assert_eq!(replaced, 4);
    assert!(rewritten.contains(&format!("StringHash(\"{}\")", agility)));
    assert!(rewritten.contains(&format!("\"购买成功：\" + \"{}\"", agility)));
    assert!(rewritten.contains("if x == \"力量\""));
}

#[tokio::test]
async fn test_synchronize_withoutScript_shouldStillSyncDictionaryTerms() {
    let mock = MockProvider::varying();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::builtin();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::Russian,
    );
    let mut mapping = IdentifierMapping::new();
    let mut table = StringTable::parse(wts(&[(1, "生命值"), (2, "生命值+100"), (3, "恢复生命值")]).as_bytes()).unwrap();

    sync.synchronize(&mut table, None, &mut mapping).await;

    let hp = mapping.get("生命值").unwrap();
    assert!(hp.starts_with("[ru] 生命值"));
    assert_eq!(table.get(1), Some(hp));
    assert_eq!(table.get(2).unwrap(), format!("{}+100", hp));
    assert!(table.get(3).unwrap().contains(hp));
}

#[tokio::test]
async fn test_synchronize_withBlacklistedLiteral_shouldTranslateIndependently() {
    let mock = MockProvider::working();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::new().with_blacklist(["敏捷"]);
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let script = ScriptSource::new(ScriptKind::Jass, JASS);
    let mut mapping = IdentifierMapping::new();
    let mut table = StringTable::parse(wts(&[(1, "敏捷")]).as_bytes()).unwrap();

    let report = sync.synchronize(&mut table, Some(&script), &mut mapping).await;

    assert!(!mapping.contains("敏捷"));
    assert_eq!(report.independent_entries, 1);
    assert_eq!(table.get(1), Some("[en] 敏捷"));
}

#[tokio::test]
async fn test_collectIdentifiers_withLuaScript_shouldUseLiteralsEqualToEntries() {
    let mock = MockProvider::working();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::new();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let lua = "-- if name == \"注释\" then\nif GetUnitName(u) == \"剑圣\" then print('h001') end\n";
    let script = ScriptSource::new(ScriptKind::Lua, lua);
    let table = StringTable::parse(wts(&[(1, "剑圣"), (2, "注释"), (3, "h001")]).as_bytes()).unwrap();

    let identifiers = sync.collect_identifiers(&table, Some(&script));

    assert_eq!(identifiers.into_iter().collect::<Vec<_>>(), vec!["剑圣".to_string()]);
}

#[tokio::test]
async fn test_synchronize_withFailingBackend_shouldStoreHintAndReportIdentifier() {
    let mock = MockProvider::failing();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::builtin();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let mut mapping = IdentifierMapping::new();
    let mut first = StringTable::parse(wts(&[(1, "护甲"), (2, "护甲+5")]).as_bytes()).unwrap();

    let report = sync.synchronize(&mut first, None, &mut mapping).await;

    assert_eq!(mapping.get("护甲"), Some("Armor"));
    assert_eq!(report.unresolved_identifiers, vec!["护甲".to_string()]);
    assert!(!report.is_clean());
    assert_eq!(first.get(1), Some("Armor"));
    assert_eq!(first.get(2), Some("Armor+5"));

    let mut later = StringTable::parse(wts(&[(7, "护甲")]).as_bytes()).unwrap();
    let report = sync.synchronize(&mut later, None, &mut mapping).await;

    assert_eq!(later.get(7), Some("Armor"));
    assert_eq!(report.newly_resolved, 0);
    assert!(report.unresolved_identifiers.is_empty());
}

#[tokio::test]
async fn test_synchronize_withFailingBackendAndNoHint_shouldKeepSourceText() {
    let mock = MockProvider::failing();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::new();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let script = ScriptSource::new(ScriptKind::Jass, JASS);
    let mut mapping = IdentifierMapping::new();
    let mut table = StringTable::parse(wts(&[(1, "智力")]).as_bytes()).unwrap();

    let report = sync.synchronize(&mut table, Some(&script), &mut mapping).await;

    assert_eq!(mapping.get("智力"), Some("智力"));
    assert_eq!(report.unresolved_identifiers, vec!["智力".to_string()]);
    assert_eq!(table.get(1), Some("智力"));
    let (rewritten, replaced) = rewrite_script(JASS, ScriptKind::Jass, &mapping);
    assert_eq!(rewritten, JASS);
    assert_eq!(replaced, 0);
}

#[tokio::test]
async fn test_synchronize_inSynchronizeMode_backendShouldBeatDictionaryHint() {
    let mock = MockProvider::working();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::builtin();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let mut mapping = IdentifierMapping::new();
    let mut table = StringTable::parse(wts(&[(1, "护甲")]).as_bytes()).unwrap();

    let report = sync.synchronize(&mut table, None, &mut mapping).await;

    assert_eq!(table.get(1), Some("[en] 护甲"));
    assert_eq!(mapping.get("护甲"), Some("[en] 护甲"));
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_synchronizeWithScripts_shouldCollectLiteralsFromEveryScript() {
    let mock = MockProvider::varying();
    let engine = test_engine(&mock);
    let dictionary = IdentifierDictionary::new();
    let sync = IdentifierSynchronizer::new(
        &engine,
        &dictionary,
        SyncMode::Synchronize,
        Language::Chinese,
        Language::English,
    );
    let chapter1 = ScriptSource::new(ScriptKind::Jass, "if LoadStr(udg_HT, 0, 1) == \"暴击\" then\nendif\n");
    let chapter2 = ScriptSource::new(ScriptKind::Lua, "if name == '剑圣' then\nend\n");
    let mut mapping = IdentifierMapping::new();
    let mut campaign =
        StringTable::parse(wts(&[(1, "暴击"), (2, "剑圣"), (3, "欢迎")]).as_bytes()).unwrap();

    let report = sync
        .synchronize_with_scripts(&mut campaign, &[&chapter1, &chapter2], &mut mapping)
        .await;

    assert_eq!(report.identifiers, 2);
    assert_eq!(campaign.get(1), mapping.get("暴击"));
    assert_eq!(campaign.get(2), mapping.get("剑圣"));
    assert!(!mapping.contains("欢迎"));
}
