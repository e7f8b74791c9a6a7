//! HD 派生路径
//!
//! 解析、校验与模板展开。所有路径在派生开始之前整体校验，
//! 任意一条不合法则整批失败。

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// 硬化索引起点
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// 模板中的地址索引占位符
pub const INDEX_PLACEHOLDER: &str = "$$INDEX$$";

/// 路径最大深度（BIP44 为 5，TON/SOL 等可能更深）
const MAX_DEPTH: usize = 8;

/// 单个路径分量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub index: u32,
    pub hardened: bool,
}

impl PathSegment {
    /// BIP32 序列化索引（硬化分量加上 2^31）
    pub fn raw_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

/// 已校验的派生路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    segments: Vec<PathSegment>,
}

impl DerivationPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// 是否所有分量都是硬化的（SLIP-0010 ed25519 要求）
    pub fn is_fully_hardened(&self) -> bool {
        self.segments.iter().all(|s| s.hardened)
    }

    /// 拼接相对路径，例如 `m/84'/0'/0'` + `0/5`
    pub fn join(&self, relative: &str) -> CoreResult<Self> {
        let mut segments = self.segments.clone();
        for part in relative.split('/').filter(|p| !p.is_empty()) {
            segments.push(parse_segment(part)?);
        }
        if segments.len() > MAX_DEPTH {
            return Err(CoreError::derivation("Invalid derivation path depth"));
        }
        Ok(Self { segments })
    }
}

fn parse_segment(part: &str) -> CoreResult<PathSegment> {
    let (number, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h')) {
        Some(number) => (number, true),
        None => (part, false),
    };

    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::derivation(format!(
            "Invalid path component: {}",
            part
        )));
    }

    let index: u32 = number
        .parse()
        .map_err(|_| CoreError::derivation(format!("Path index overflow: {}", part)))?;
    if index >= HARDENED_OFFSET {
        return Err(CoreError::derivation(format!(
            "Path index out of range: {}",
            part
        )));
    }

    Ok(PathSegment { index, hardened })
}

impl FromStr for DerivationPath {
    type Err = CoreError;

    fn from_str(path: &str) -> CoreResult<Self> {
        // 1. 基本格式验证
        let body = path
            .strip_prefix("m/")
            .ok_or_else(|| CoreError::derivation("Path must start with 'm/'"))?;

        // 2. 解析路径组件
        let segments = body
            .split('/')
            .map(parse_segment)
            .collect::<CoreResult<Vec<_>>>()?;

        if segments.is_empty() || segments.len() > MAX_DEPTH {
            return Err(CoreError::derivation("Invalid derivation path depth"));
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for segment in &self.segments {
            if segment.hardened {
                write!(f, "/{}'", segment.index)?;
            } else {
                write!(f, "/{}", segment.index)?;
            }
        }
        Ok(())
    }
}

/// 派生路径模板，如 `m/44'/60'/0'/0/$$INDEX$$`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 展开模板
    pub fn build(&self, index: u32) -> CoreResult<DerivationPath> {
        if !self.0.contains(INDEX_PLACEHOLDER) {
            return Err(CoreError::derivation(format!(
                "Template has no index placeholder: {}",
                self.0
            )));
        }
        self.0
            .replace(INDEX_PLACEHOLDER, &index.to_string())
            .parse()
    }

    /// 批量展开（保持顺序；任一失败整体失败）
    pub fn build_all(&self, indexes: &[u32]) -> CoreResult<Vec<DerivationPath>> {
        indexes.iter().map(|i| self.build(*i)).collect()
    }
}

/// 解析一批路径；全部合法才返回
pub fn parse_all(paths: &[String]) -> CoreResult<Vec<DerivationPath>> {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.parse::<DerivationPath>().map_err(|e| {
                CoreError::derivation(format!("path #{} ({}) rejected: {}", i, p, e))
            })
        })
        .collect()
}
