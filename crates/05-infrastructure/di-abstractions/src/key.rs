//! 服务类型键
//!
//! 类型键是注册表的查找键，区分具体类型、开放泛型定义和封闭泛型实例。
//! 键按结构比较：基础标识符和每个类型参数都递归相等时两个键才相等。

use infrastructure_common::{DependencyError, DependencyResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 泛型参数绑定表，参数名 -> 封闭类型键
pub type Bindings = HashMap<String, TypeKey>;

/// 解析字符串类型键时允许的最大泛型嵌套层数
pub const MAX_KEY_NESTING: usize = 64;

/// 类型键
///
/// - `Type { base, args }` 且 `args` 为空：具体类型，例如 `ISampleService`
/// - `Type` 且所有参数都是 `Parameter`：开放泛型，例如 `IGenericService<T>`
/// - `Type` 且不含任何 `Parameter`：封闭泛型，例如 `IGenericService<int>`
/// - `Parameter`：未绑定的泛型参数，只出现在模板中
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    /// 具名类型及其类型参数
    Type { base: String, args: Vec<TypeKey> },
    /// 未绑定的泛型参数
    Parameter(String),
}

/// 泛型定义，开放泛型回退表的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericDefinition {
    pub base: String,
    pub arity: usize,
}

impl fmt::Display for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.base, ",".repeat(self.arity.saturating_sub(1)))
    }
}

impl TypeKey {
    /// 创建具体类型键
    pub fn concrete(base: impl Into<String>) -> Self {
        Self::Type {
            base: base.into(),
            args: Vec::new(),
        }
    }

    /// 创建泛型类型键，参数可以是封闭类型也可以是泛型参数
    pub fn generic(base: impl Into<String>, args: impl IntoIterator<Item = TypeKey>) -> Self {
        Self::Type {
            base: base.into(),
            args: args.into_iter().collect(),
        }
    }

    /// 创建开放泛型键
    pub fn open<S: Into<String>>(base: impl Into<String>, params: impl IntoIterator<Item = S>) -> Self {
        Self::generic(base, params.into_iter().map(Self::param))
    }

    /// 创建泛型参数
    pub fn param(name: impl Into<String>) -> Self {
        Self::Parameter(name.into())
    }

    /// 基础标识符，泛型参数返回参数名
    pub fn base(&self) -> &str {
        match self {
            Self::Type { base, .. } => base,
            Self::Parameter(name) => name,
        }
    }

    /// 类型参数
    pub fn args(&self) -> &[TypeKey] {
        match self {
            Self::Type { args, .. } => args,
            Self::Parameter(_) => &[],
        }
    }

    /// 泛型元数
    pub fn arity(&self) -> usize {
        self.args().len()
    }

    /// 是否为泛型参数
    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter(_))
    }

    /// 是否为具体（非泛型）类型
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Type { args, .. } if args.is_empty())
    }

    /// 是否为开放泛型：元数大于 0 且所有参数槽位都未绑定
    pub fn is_open_generic(&self) -> bool {
        self.arity() > 0 && self.args().iter().all(Self::is_parameter)
    }

    /// 是否为封闭泛型：元数大于 0 且任何层级都不含泛型参数
    pub fn is_closed_generic(&self) -> bool {
        self.arity() > 0 && self.is_closed()
    }

    /// 是否完全封闭（具体类型或封闭泛型）
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Type { args, .. } => args.iter().all(Self::is_closed),
            Self::Parameter(_) => false,
        }
    }

    /// 泛型定义（基础标识符 + 元数）
    pub fn definition(&self) -> Option<GenericDefinition> {
        match self {
            Self::Type { base, args } => Some(GenericDefinition {
                base: base.clone(),
                arity: args.len(),
            }),
            Self::Parameter(_) => None,
        }
    }

    /// 按首次出现顺序列出所有不同的泛型参数
    pub fn parameters(&self) -> Vec<&str> {
        let mut params = Vec::new();
        self.collect_parameters(&mut params);
        params
    }

    pub(crate) fn collect_parameters<'a>(&'a self, params: &mut Vec<&'a str>) {
        match self {
            Self::Type { args, .. } => {
                for arg in args {
                    arg.collect_parameters(params);
                }
            }
            Self::Parameter(name) => {
                if !params.contains(&name.as_str()) {
                    params.push(name);
                }
            }
        }
    }

    /// 将模板与封闭请求键合一，返回参数绑定
    ///
    /// 绑定参数按位置递归匹配；已绑定的类型参数必须完全相等，
    /// 同一参数出现多次时必须绑定到同一类型。
    pub fn unify(&self, request: &TypeKey) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        self.unify_into(request, &mut bindings).then_some(bindings)
    }

    fn unify_into(&self, request: &TypeKey, bindings: &mut Bindings) -> bool {
        match (self, request) {
            (Self::Parameter(name), bound) => {
                if !bound.is_closed() {
                    return false;
                }
                match bindings.get(name) {
                    Some(existing) => existing == bound,
                    None => {
                        bindings.insert(name.clone(), bound.clone());
                        true
                    }
                }
            }
            (
                Self::Type { base, args },
                Self::Type {
                    base: request_base,
                    args: request_args,
                },
            ) => {
                base == request_base
                    && args.len() == request_args.len()
                    && args
                        .iter()
                        .zip(request_args)
                        .all(|(template, bound)| template.unify_into(bound, bindings))
            }
            (Self::Type { .. }, Self::Parameter(_)) => false,
        }
    }

    /// 用绑定替换所有泛型参数
    ///
    /// 存在未绑定参数时返回这些参数名。
    pub fn substitute(&self, bindings: &Bindings) -> Result<TypeKey, Vec<String>> {
        let mut unbound = Vec::new();
        let key = self.substitute_into(bindings, &mut unbound);
        if unbound.is_empty() {
            Ok(key)
        } else {
            Err(unbound)
        }
    }

    fn substitute_into(&self, bindings: &Bindings, unbound: &mut Vec<String>) -> TypeKey {
        match self {
            Self::Type { base, args } => Self::Type {
                base: base.clone(),
                args: args
                    .iter()
                    .map(|arg| arg.substitute_into(bindings, unbound))
                    .collect(),
            },
            Self::Parameter(name) => match bindings.get(name) {
                Some(bound) => bound.clone(),
                None => {
                    if !unbound.contains(name) {
                        unbound.push(name.clone());
                    }
                    self.clone()
                }
            },
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameter(name) => f.write_str(name),
            Self::Type { base, args } => {
                f.write_str(base)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (index, arg) in args.iter().enumerate() {
                        if index > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for TypeKey {
    type Err = DependencyError;

    /// 解析 `Name`、`Name<A, B<C>>`；空槽位（`Name<>`、`Name<,>`）生成参数 `T0`、`T1`
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = KeyParser::new(input);
        let key = parser.parse_key()?;
        parser.skip_whitespace();
        if parser.peek().is_some() {
            return Err(parser.error("存在多余的字符"));
        }
        Ok(key)
    }
}

impl Serialize for TypeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

struct KeyParser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl<'a> KeyParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> DependencyError {
        DependencyError::InvalidTypeKey {
            input: self.input.to_string(),
            message: format!("{message} (位置 {})", self.pos),
        }
    }

    fn parse_key(&mut self) -> DependencyResult<TypeKey> {
        self.skip_whitespace();
        let base = self.parse_identifier()?;
        self.skip_whitespace();
        if self.peek() != Some('<') {
            return Ok(TypeKey::concrete(base));
        }
        self.pos += 1;

        if self.depth >= MAX_KEY_NESTING {
            return Err(self.error(&format!("泛型嵌套超过 {MAX_KEY_NESTING} 层")));
        }
        self.depth += 1;
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(',' | '>') => args.push(TypeKey::param(format!("T{}", args.len()))),
                _ => args.push(self.parse_key()?),
            }
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some('>') => break,
                _ => return Err(self.error("缺少 '>'")),
            }
        }
        self.depth -= 1;

        Ok(TypeKey::Type { base, args })
    }

    fn parse_identifier(&mut self) -> DependencyResult<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ':'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("缺少类型名称"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}
