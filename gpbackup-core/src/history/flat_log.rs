use super::History;
use crate::Result;
use std::fs;
use std::path::Path;

/// 读取 `gpbackup_history.yaml`
///
/// gpbackup 写入时已经按时间戳倒序排列，最新的备份在文件开头，这里不再排序。
/// 文件中的全部记录（包括失败和已删除的备份）都会返回；
/// 反序列化失败时整体报错，不返回部分结果。
pub(super) fn load(path: &Path) -> Result<History> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

pub(super) fn parse(content: &str) -> Result<History> {
    let history: History = serde_yaml::from_str(content)?;
    Ok(history)
}
