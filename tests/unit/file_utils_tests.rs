/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::Path;
use anyhow::Result;
use lingobatch::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));

    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that language_output_path names files after the language
#[test]
fn test_languageOutputPath_shouldUseLanguageCode() {
    let output_path = FileManager::language_output_path(Path::new("/tmp/output"), "zh-tw", ".srt");

    assert_eq!(output_path, Path::new("/tmp/output/zh-tw.srt"));
}

/// Test that ensure_dir creates directories as needed
#[test]
fn test_ensure_dir_withNonExistentDir_shouldCreateDirectory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_subdir = temp_dir.path().join("a").join("b");

    FileManager::ensure_dir(&test_subdir)?;

    assert!(FileManager::dir_exists(&test_subdir));
    Ok(())
}

/// Test that write_atomic replaces content and leaves no temp files behind
#[test]
fn test_writeAtomic_shouldReplaceContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("out").join("en.srt");

    FileManager::write_atomic(&path, "first")?;
    FileManager::write_atomic(&path, "second")?;

    assert_eq!(fs::read_to_string(&path)?, "second");
    assert_eq!(fs::read_dir(temp_dir.path().join("out"))?.count(), 1);
    Ok(())
}

/// Test that read_text strips a BOM and decodes legacy Korean files
#[test]
fn test_readText_shouldHandleBomAndEucKr() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let bom_path = temp_dir.path().join("bom.srt");
    fs::write(&bom_path, "\u{feff}1\n")?;
    assert_eq!(FileManager::read_text(&bom_path)?, "1\n");

    let euc_path = temp_dir.path().join("euc.srt");
    let (encoded, _, _) = encoding_rs::EUC_KR.encode("안녕하세요");
    fs::write(&euc_path, &encoded)?;
    assert_eq!(FileManager::read_text(&euc_path)?, "안녕하세요");

    Ok(())
}
