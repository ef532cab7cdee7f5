//! 服务定义
//!
//! `Service` 是期望集合（Source）与已注册集合（Registry）共用的实体，
//! 每个对账周期都会重新构造，不跨周期保存。

pub mod validation;

pub use validation::{RequireNode, ServiceValidator, ValidationError, validate_with};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// 服务实例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Service {
    /// 服务名称（必填）
    #[serde(default)]
    pub name: String,

    /// 服务地址（必填）
    #[serde(default)]
    pub address: String,

    /// 显式注册标识，缺省时使用 `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// 端口
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// 标签（空集合等同于未设置）
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// 元数据
    #[serde(default, alias = "meta", skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    /// 节点信息（按节点粒度注册的后端需要）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
}

/// 节点信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Node {
    /// 节点名称
    #[serde(default)]
    pub node: String,

    /// 节点地址
    #[serde(default)]
    pub address: String,

    /// 数据中心
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// 节点元数据
    #[serde(default, alias = "meta", skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Service {
    /// 创建新的服务
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    /// 设置显式标识
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// 添加标签
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 设置节点信息
    pub fn with_node(mut self, node: Node) -> Self {
        self.node = Some(node);
        self
    }

    /// 注册标识：`id` 优先，否则为 `name`
    pub fn identity(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// 基础校验
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }
}

impl Node {
    pub fn new(node: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 有序服务集合
///
/// 顺序没有业务含义，但保持不变以便测试中的迭代是确定的
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Services(Vec<Service>);

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, service: Service) {
        self.0.push(service);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Service> {
        self.0.iter()
    }

    /// 所有注册标识
    pub fn identities(&self) -> HashSet<&str> {
        self.0.iter().map(Service::identity).collect()
    }

    /// 按注册标识查找服务（返回第一个匹配项）
    pub fn lookup(&self, identity: &str) -> Option<&Service> {
        self.0.iter().find(|s| s.identity() == identity)
    }

    pub fn as_slice(&self) -> &[Service] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Service> {
        self.0
    }
}

impl From<Vec<Service>> for Services {
    fn from(services: Vec<Service>) -> Self {
        Self(services)
    }
}

impl FromIterator<Service> for Services {
    fn from_iter<I: IntoIterator<Item = Service>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Services {
    type Item = Service;
    type IntoIter = std::vec::IntoIter<Service>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Services {
    type Item = &'a Service;
    type IntoIter = std::slice::Iter<'a, Service>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
