//! Environment builder: the names a snippet can see
//!
//! The namespace is described here as plain data and handed to the worker,
//! which resolves each name against its own interpreter. Nothing outside
//! [`BUILTINS`] and the policy's module allowlist is ever placed in it.

use serde::Serialize;

use crate::policy::SecurityPolicy;

/// What a builtin is for, as listed by `snipbox stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Constructor,
    Iteration,
    Introspection,
    Exception,
    Output,
    /// Interpreter hooks behind `class` and `import` statements
    Hook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Builtin {
    pub name: &'static str,
    pub capability: Capability,
}

const fn builtin(name: &'static str, capability: Capability) -> Builtin {
    Builtin { name, capability }
}

/// The closed set of builtins a snippet may call.
///
/// `__import__` is not the interpreter's importer: the worker binds it to a
/// guard that only admits allowlisted modules.
pub const BUILTINS: &[Builtin] = &[
    builtin("str", Capability::Constructor),
    builtin("int", Capability::Constructor),
    builtin("float", Capability::Constructor),
    builtin("bool", Capability::Constructor),
    builtin("list", Capability::Constructor),
    builtin("dict", Capability::Constructor),
    builtin("tuple", Capability::Constructor),
    builtin("set", Capability::Constructor),
    builtin("len", Capability::Iteration),
    builtin("range", Capability::Iteration),
    builtin("enumerate", Capability::Iteration),
    builtin("zip", Capability::Iteration),
    builtin("map", Capability::Iteration),
    builtin("filter", Capability::Iteration),
    builtin("sorted", Capability::Iteration),
    builtin("sum", Capability::Iteration),
    builtin("min", Capability::Iteration),
    builtin("max", Capability::Iteration),
    builtin("abs", Capability::Iteration),
    builtin("round", Capability::Iteration),
    builtin("pow", Capability::Iteration),
    builtin("divmod", Capability::Iteration),
    builtin("type", Capability::Introspection),
    builtin("isinstance", Capability::Introspection),
    builtin("Exception", Capability::Exception),
    builtin("ValueError", Capability::Exception),
    builtin("TypeError", Capability::Exception),
    builtin("IndexError", Capability::Exception),
    builtin("KeyError", Capability::Exception),
    builtin("ZeroDivisionError", Capability::Exception),
    builtin("AttributeError", Capability::Exception),
    builtin("StopIteration", Capability::Exception),
    builtin("print", Capability::Output),
    builtin("__build_class__", Capability::Hook),
    builtin("__import__", Capability::Hook),
];

/// An allowlisted module and the name it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleBinding {
    pub module: String,
    pub alias: String,
}

impl ModuleBinding {
    /// Bind `matplotlib.pyplot` as `pyplot`, `math` as `math`.
    pub fn new(module: &str) -> Self {
        let alias = module.rsplit('.').next().unwrap_or(module);
        Self {
            module: module.to_string(),
            alias: alias.to_string(),
        }
    }
}

/// Names visible to a single execution. Built per request, consumed by the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionNamespace {
    pub builtins: Vec<&'static str>,
    pub modules: Vec<ModuleBinding>,
}

impl ExecutionNamespace {
    /// Build a fresh namespace from the policy's allowlist.
    pub fn build(policy: &SecurityPolicy) -> Self {
        Self {
            builtins: BUILTINS.iter().map(|b| b.name).collect(),
            modules: policy
                .allowed_modules
                .iter()
                .filter(|m| !m.trim().is_empty())
                .map(|m| ModuleBinding::new(m.trim()))
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains(&name) || self.modules.iter().any(|m| m.alias == name)
    }
}
