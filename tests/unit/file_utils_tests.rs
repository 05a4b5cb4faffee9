/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::PathBuf;
use anyhow::Result;
use w3translate::file_utils::FileManager;
use crate::common;

/// Test that file_exists only accepts regular files
#[test]
fn test_fileExists_withDirectory_shouldReturnFalse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = temp_dir.path().join("Campaign.w3n");
    fs::write(&file, b"archive")?;

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));

    Ok(())
}

/// Test that copy_file creates missing parent directories
#[test]
fn test_copyFile_withMissingTargetDir_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let from = temp_dir.path().join("Chapter2.w3x");
    fs::write(&from, b"map bytes")?;
    let to = temp_dir.path().join("protected/nested/Chapter2.w3x");

    FileManager::copy_file(&from, &to)?;

    assert_eq!(fs::read(&to)?, b"map bytes");
    assert_eq!(FileManager::sha256_file(&from)?, FileManager::sha256_file(&to)?);
    Ok(())
}

/// Test that copying a missing file fails
#[test]
fn test_copyFile_withMissingSource_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = FileManager::copy_file(temp_dir.path().join("missing.w3x"), temp_dir.path().join("out.w3x"));
    assert!(result.is_err());
    Ok(())
}

/// Test that extension filtering is case-insensitive
#[test]
fn test_filterByExtension_shouldMatchMapArchives() {
    let files = vec![
        PathBuf::from("Chapter1.W3X"),
        PathBuf::from("Chapter2.w3m"),
        PathBuf::from("war3campaign.wts"),
        PathBuf::from("(listfile)"),
    ];

    let maps = FileManager::filter_by_extension(&files, &["w3x", "w3m"]);
    assert_eq!(maps, vec![PathBuf::from("Chapter1.W3X"), PathBuf::from("Chapter2.w3m")]);
}

/// Test that a name lookup falls back to nested files
#[test]
fn test_findByName_withNestedFile_shouldFallBackToFileName() {
    let files = [PathBuf::from("scripts/war3map.j"), PathBuf::from("war3map.wts")]
        .into_iter()
        .collect();

    assert_eq!(
        FileManager::find_by_name(&files, "war3map.j"),
        Some(&PathBuf::from("scripts/war3map.j"))
    );
}
