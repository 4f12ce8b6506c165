//! Tool callables: free functions, classes of methods, and invocation targets.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::arguments::ToolArguments;
use super::descriptor::ToolDescriptor;
use super::schema::synthesize;
use super::spec::ToolSpec;
use crate::error::{Result, StockbotError};

/// Future returned by every tool handler.
pub type ToolFuture = BoxFuture<'static, Result<Value>>;

/// Shared owner instance of a method tool.
pub type SharedOwner = Arc<dyn Any + Send + Sync>;

type FunctionHandler = dyn Fn(ToolArguments) -> ToolFuture + Send + Sync;
type MethodHandler = dyn Fn(SharedOwner, ToolArguments) -> ToolFuture + Send + Sync;

/// Owning type retained by a method target so it can be rebound per call.
#[derive(Clone)]
pub struct OwnerRef {
    type_name: String,
    instance: SharedOwner,
}

impl OwnerRef {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Debug for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerRef")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// What a registered tool name resolves to.
#[derive(Clone)]
pub enum ToolTarget {
    Function(Arc<FunctionHandler>),
    Method {
        owner: OwnerRef,
        handler: Arc<MethodHandler>,
    },
}

impl ToolTarget {
    /// Call the target, binding methods to their owner first.
    pub fn call(&self, args: ToolArguments) -> ToolFuture {
        match self {
            Self::Function(handler) => handler(args),
            Self::Method { owner, handler } => handler(Arc::clone(&owner.instance), args),
        }
    }

    pub fn owner(&self) -> Option<&OwnerRef> {
        match self {
            Self::Function(_) => None,
            Self::Method { owner, .. } => Some(owner),
        }
    }
}

impl fmt::Debug for ToolTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function"),
            Self::Method { owner, .. } => f.debug_struct("Method").field("owner", owner).finish(),
        }
    }
}

/// A free-function tool.
pub struct FunctionTool {
    descriptor: ToolDescriptor,
    handler: Arc<FunctionHandler>,
}

impl FunctionTool {
    /// Pair a declaration with its handler.
    ///
    /// The schema is synthesized here, so a malformed declaration fails when
    /// the tool is built rather than when it is called.
    pub fn new<F, Fut>(spec: ToolSpec, handler: F) -> Result<Self>
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let descriptor = synthesize(&spec, None)?;
        Ok(Self {
            descriptor,
            handler: Arc::new(move |args: ToolArguments| -> ToolFuture { handler(args).boxed() }),
        })
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub(crate) fn into_parts(self) -> (ToolDescriptor, ToolTarget) {
        (self.descriptor, ToolTarget::Function(self.handler))
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

/// A type whose methods are exposed as tools under `TypeName.method`.
pub struct ToolClass {
    type_name: String,
    instance: SharedOwner,
    methods: Vec<(ToolDescriptor, Arc<MethodHandler>)>,
}

impl ToolClass {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, instance: T) -> Self {
        Self::from_shared(type_name, Arc::new(instance))
    }

    pub fn from_shared<T: Any + Send + Sync>(type_name: impl Into<String>, instance: Arc<T>) -> Self {
        Self {
            type_name: type_name.into(),
            instance,
            methods: Vec::new(),
        }
    }

    /// Attach a method. `T` must be the type the class was created with.
    pub fn method<T, F, Fut>(mut self, spec: ToolSpec, handler: F) -> Result<Self>
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>, ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let descriptor = synthesize(&spec, Some(&self.type_name))?;
        if self.methods.iter().any(|(d, _)| d.name == descriptor.name) {
            return Err(StockbotError::schema(&descriptor.name, "method declared twice"));
        }

        let tool = descriptor.name.clone();
        let erased = move |owner: SharedOwner, args: ToolArguments| -> ToolFuture {
            match owner.downcast::<T>() {
                Ok(owner) => handler(owner, args).boxed(),
                Err(_) => {
                    let err = StockbotError::invocation(&tool, "owner instance has the wrong type");
                    async move { Err(err) }.boxed()
                }
            }
        };
        self.methods.push((descriptor, Arc::new(erased)));
        Ok(self)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.methods.iter().map(|(d, _)| d)
    }

    pub(crate) fn into_parts(self) -> Vec<(ToolDescriptor, ToolTarget)> {
        let owner = OwnerRef {
            type_name: self.type_name,
            instance: self.instance,
        };
        self.methods
            .into_iter()
            .map(|(descriptor, handler)| {
                (
                    descriptor,
                    ToolTarget::Method {
                        owner: owner.clone(),
                        handler,
                    },
                )
            })
            .collect()
    }
}

impl fmt::Debug for ToolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolClass")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods.iter().map(|(d, _)| &d.name).collect::<Vec<_>>())
            .finish()
    }
}
