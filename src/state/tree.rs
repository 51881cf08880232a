//! 记录树
//!
//! 表单记录的运行时表示：一棵由映射、序列和基本值组成的树。
//! 容器节点使用 `Arc` 共享，更新时只复制路径上的容器，
//! 其余子树在新旧版本之间保持指针相同。

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 映射节点的内部存储
pub type MapNode = BTreeMap<String, Node>;

/// 记录树节点
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Node {
    #[default]
    Null,
    /// `false` 同时表示"该部分不适用"
    Bool(bool),
    Number(Number),
    Text(String),
    Map(Arc<MapNode>),
    Seq(Arc<Vec<Node>>),
}

impl Node {
    /// 空映射
    pub fn empty_map() -> Self {
        Node::Map(Arc::new(MapNode::new()))
    }

    /// 空序列
    pub fn empty_seq() -> Self {
        Node::Seq(Arc::new(Vec::new()))
    }

    /// 文本节点
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    /// 由键值对构建映射节点
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// 由元素构建序列节点
    pub fn seq(items: impl IntoIterator<Item = Node>) -> Self {
        Node::Seq(Arc::new(items.into_iter().collect()))
    }

    /// 是否为"不适用"标记（`false`）或空值
    pub fn is_absent(&self) -> bool {
        matches!(self, Node::Null | Node::Bool(false))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(s) => Some(s),
            _ => None,
        }
    }

    /// 映射中按键取子节点
    pub fn child(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// 节点种类名（用于错误信息）
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::Text(_) => "text",
            Node::Map(_) => "map",
            Node::Seq(_) => "seq",
        }
    }

    /// 引用相等
    ///
    /// 容器节点比较 `Arc` 指针；基本值没有身份，按值比较。
    pub fn ptr_eq(a: &Node, b: &Node) -> bool {
        match (a, b) {
            (Node::Map(x), Node::Map(y)) => Arc::ptr_eq(x, y),
            (Node::Seq(x), Node::Seq(y)) => Arc::ptr_eq(x, y),
            (Node::Map(_), _) | (Node::Seq(_), _) | (_, Node::Map(_)) | (_, Node::Seq(_)) => false,
            _ => a == b,
        }
    }

    /// 转换为 JSON 值
    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Number(a), Node::Number(b)) => a == b,
            (Node::Text(a), Node::Text(b)) => a == b,
            (Node::Map(a), Node::Map(b)) => Arc::ptr_eq(a, b) || a == b,
            (Node::Seq(a), Node::Seq(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => Node::Number(n),
            Value::String(s) => Node::Text(s),
            Value::Array(items) => Node::seq(items.into_iter().map(Node::from)),
            Value::Object(obj) => Node::map(obj.into_iter().map(|(k, v)| (k, Node::from(v)))),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Number(n) => Value::Number(n),
            Node::Text(s) => Value::String(s),
            Node::Map(m) => {
                let obj: JsonMap<String, Value> = m
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                    .collect();
                Value::Object(obj)
            }
            Node::Seq(items) => Value::Array(items.iter().cloned().map(Value::from).collect()),
        }
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<Option<String>> for Node {
    fn from(s: Option<String>) -> Self {
        s.map(Node::Text).unwrap_or(Node::Null)
    }
}
