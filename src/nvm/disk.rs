//! nvm 根目录磁盘占用统计

use super::types::DiskUsage;
use anyhow::{bail, Result};
use std::path::Path;
use walkdir::WalkDir;

/// 递归统计目录下所有文件的大小
///
/// 读取失败的单个条目只记日志并跳过，不影响总数。
pub fn directory_size(root: &Path) -> Result<DiskUsage> {
    if !root.is_dir() {
        bail!("目录不存在: {}", root.display());
    }

    let mut bytes = 0u64;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("跳过无法访问的条目: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => bytes += meta.len(),
            Err(e) => log::debug!("读取文件大小失败 {}: {}", entry.path().display(), e),
        }
    }

    Ok(DiskUsage { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();
        let nested = dir.path().join("v18.17.0").join("node_modules");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("b.bin"), vec![0u8; 250]).unwrap();

        let usage = directory_size(dir.path()).unwrap();
        assert_eq!(usage.bytes, 350);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(directory_size(&dir.path().join("missing")).is_err());
    }
}
