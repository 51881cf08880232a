//! 路径寻址与不可变更新
//!
//! `update(root, path, value)` 返回一棵新树：
//! - 从根到目标位置路径上的每个容器（含根）都是新的浅拷贝
//! - 不在路径上的子树与旧树共享（`Node::ptr_eq` 为真）
//! - 不存在的中间节点按下一段的类型补成空映射或空序列
//! - 越过序列末尾的索引返回 `InvalidPath`，不做填充

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{AppError, AppResult, PathError};
use crate::state::tree::{MapNode, Node};

/// 路径中的一段
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// 记录内位置的有序段列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// 追加键段
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }

    /// 追加索引段
    pub fn index(mut self, index: usize) -> Self {
        self.0.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", text.join("."))
    }
}

impl<S: Into<Segment>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Path(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for Path {
    fn from(keys: &[&str]) -> Self {
        keys.iter().copied().collect()
    }
}

/// 点分文本：`stateAuthorityActions.0.name`，纯数字段视为索引
impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PathError::Unparsable(s.to_string()));
        }
        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            if part.is_empty() {
                return Err(PathError::Unparsable(s.to_string()));
            }
            if part.chars().all(|c| c.is_ascii_digit()) {
                let index = part
                    .parse::<usize>()
                    .map_err(|_| PathError::Unparsable(s.to_string()))?;
                segments.push(Segment::Index(index));
            } else {
                segments.push(Segment::Key(part.to_string()));
            }
        }
        Ok(Path(segments))
    }
}

/// 读取路径上的节点
pub fn get<'a>(root: &'a Node, path: &Path) -> Option<&'a Node> {
    let mut current = root;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(k), Node::Map(m)) => m.get(k)?,
            (Segment::Index(i), Node::Seq(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// 将 `value` 写入 `path` 指向的位置，返回新根
///
/// # 参数
/// - `root`: 原始记录（不会被修改）
/// - `path`: 非空路径
/// - `value`: 任意新值，不做类型校验
///
/// # 返回
/// 新记录；路径为空、索引越界或穿过不兼容节点时返回 `InvalidPath`
pub fn update(root: &Node, path: &Path, value: Node) -> AppResult<Node> {
    if path.is_empty() {
        return Err(AppError::invalid_path("", "路径不能为空"));
    }
    set_in(root, path, 0, value)
}

fn set_in(node: &Node, path: &Path, depth: usize, value: Node) -> AppResult<Node> {
    let segments = path.segments();
    let Some(segment) = segments.get(depth) else {
        return Ok(value);
    };

    match segment {
        Segment::Key(key) => {
            let mut map: MapNode = match node {
                Node::Map(m) => (**m).clone(),
                n if n.is_absent() => MapNode::new(),
                other => return Err(descent_error(path, depth, other)),
            };
            let child = map.get(key).cloned().unwrap_or_default();
            let new_child = set_in(&child, path, depth + 1, value)?;
            map.insert(key.clone(), new_child);
            Ok(Node::Map(Arc::new(map)))
        }
        Segment::Index(index) => {
            let mut items: Vec<Node> = match node {
                Node::Seq(s) => (**s).clone(),
                n if n.is_absent() => Vec::new(),
                other => return Err(descent_error(path, depth, other)),
            };
            if *index > items.len() {
                return Err(AppError::invalid_path(
                    path.to_string(),
                    format!("索引 {} 超出序列长度 {}", index, items.len()),
                ));
            }
            let child = items.get(*index).cloned().unwrap_or_default();
            let new_child = set_in(&child, path, depth + 1, value)?;
            if *index == items.len() {
                items.push(new_child);
            } else {
                items[*index] = new_child;
            }
            Ok(Node::Seq(Arc::new(items)))
        }
    }
}

fn descent_error(path: &Path, depth: usize, node: &Node) -> AppError {
    AppError::invalid_path(
        path.to_string(),
        format!(
            "第 {} 段 '{}' 无法进入 {} 节点",
            depth + 1,
            path.segments()[depth],
            node.kind()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        Node::from(json!({
            "personalData": {"pesel": "", "email": ""},
            "accidentDetails": {"date": "", "time": ""},
            "stateAuthorityActions": [{"name": "PIP"}],
            "medicalHelp": false
        }))
    }

    #[test]
    fn test_update_sets_value_at_path() {
        let root = sample();
        let path: Path = "accidentDetails.date".parse().unwrap();
        let updated = update(&root, &path, Node::text("2024-05-01")).unwrap();

        assert_eq!(get(&updated, &path), Some(&Node::text("2024-05-01")));
        // 原记录保持不变
        assert_eq!(get(&root, &path), Some(&Node::text("")));
    }

    #[test]
    fn test_update_shares_unrelated_subtrees() {
        let root = sample();
        let path: Path = "accidentDetails.date".parse().unwrap();
        let updated = update(&root, &path, Node::text("2024-05-01")).unwrap();

        let personal = Path::new().key("personalData");
        let actions = Path::new().key("stateAuthorityActions");
        assert!(Node::ptr_eq(
            get(&root, &personal).unwrap(),
            get(&updated, &personal).unwrap()
        ));
        assert!(Node::ptr_eq(
            get(&root, &actions).unwrap(),
            get(&updated, &actions).unwrap()
        ));

        // 路径上的容器都是新的
        assert!(!Node::ptr_eq(&root, &updated));
        let details = Path::new().key("accidentDetails");
        assert!(!Node::ptr_eq(
            get(&root, &details).unwrap(),
            get(&updated, &details).unwrap()
        ));
    }

    #[test]
    fn test_update_is_idempotent() {
        let root = sample();
        let path: Path = "stateAuthorityActions.0.name".parse().unwrap();
        let once = update(&root, &path, Node::text("Policja")).unwrap();
        let twice = update(&once, &path, Node::text("Policja")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_update_creates_missing_intermediates() {
        let root = Node::empty_map();
        let path = Path::new().key("a").key("b").index(0).key("c");
        let updated = update(&root, &path, Node::Bool(true)).unwrap();
        assert_eq!(updated.to_json(), json!({"a": {"b": [{"c": true}]}}));
    }

    #[test]
    fn test_update_replaces_false_sentinel_with_container() {
        let root = sample();
        let path: Path = "medicalHelp.diagnosedInjury".parse().unwrap();
        let updated = update(&root, &path, Node::text("złamanie")).unwrap();
        assert_eq!(
            get(&updated, &Path::new().key("medicalHelp")).unwrap().to_json(),
            json!({"diagnosedInjury": "złamanie"})
        );
    }

    #[test]
    fn test_update_appends_at_len_but_rejects_past_end() {
        let root = sample();
        let append: Path = "stateAuthorityActions.1".parse().unwrap();
        let updated = update(&root, &append, Node::map([("name", Node::text("Prokuratura"))])).unwrap();
        assert_eq!(
            get(&updated, &Path::new().key("stateAuthorityActions"))
                .and_then(|n| n.as_seq())
                .map(|s| s.len()),
            Some(2)
        );

        let past_end: Path = "stateAuthorityActions.5".parse().unwrap();
        let err = update(&root, &past_end, Node::Null).unwrap_err();
        assert!(matches!(err, AppError::Path(PathError::InvalidPath { .. })));
    }

    #[test]
    fn test_update_rejects_empty_path_and_scalar_descent() {
        let root = sample();
        assert!(update(&root, &Path::new(), Node::Null).is_err());

        let through_text: Path = "personalData.pesel.x".parse().unwrap();
        assert!(update(&root, &through_text, Node::Null).is_err());

        let key_into_seq: Path = "stateAuthorityActions.name".parse().unwrap();
        assert!(update(&root, &key_into_seq, Node::Null).is_err());
    }

    #[test]
    fn test_path_parse_and_display() {
        let path: Path = "a.0.b".parse().unwrap();
        assert_eq!(path, Path::new().key("a").index(0).key("b"));
        assert_eq!(path.to_string(), "a.0.b");
        assert!("".parse::<Path>().is_err());
        assert!("a..b".parse::<Path>().is_err());
    }
}
