//! The MIR context: registries that outlive both the FIR and the MIR.
//!
//! Element types, the ordered function registry, global variables, and the
//! backend configuration live here. Backend configuration addresses program
//! points by statement label, which is why every MIR statement carries one.

use rustc_hash::{FxHashMap, FxHashSet};

use super::{MirExpr, MirFunction, MirType, MirVar};

/// A declared element type and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTypeDef {
    pub name: String,
    pub fields: Vec<MirVar>,
}

/// A global (top-level `const` or `extern`) variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    pub name: String,
    pub ty: MirType,
    pub init: Option<MirExpr>,
    pub is_const: bool,
}

/// How an edgeset apply at a labeled program point should traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionChoice {
    Push,
    Pull,
    /// Emit both and pick at runtime on frontier size.
    Hybrid { threshold: i64 },
}

/// Backend configuration consumed by the direction pass and the code
/// generators.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Identifier prefix for generated symbols.
    pub module_name: String,
    /// Traversal choice per statement label.
    pub directions: FxHashMap<String, DirectionChoice>,
    /// Labels of `while` loops to compile as single fused kernels.
    pub fused_kernels: FxHashSet<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            module_name: "ripple".to_string(),
            directions: FxHashMap::default(),
            fused_kernels: FxHashSet::default(),
        }
    }
}

/// Registry for element types, functions, globals, and configuration.
#[derive(Debug)]
pub struct MirContext {
    pub element_types: Vec<ElementTypeDef>,
    pub functions: Vec<MirFunction>,
    function_index: FxHashMap<String, usize>,
    pub globals: Vec<GlobalVar>,
    pub config: BackendConfig,
}

impl MirContext {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            element_types: Vec::new(),
            functions: Vec::new(),
            function_index: FxHashMap::default(),
            globals: Vec::new(),
            config,
        }
    }

    pub fn add_element_type(&mut self, def: ElementTypeDef) {
        self.element_types.push(def);
    }

    pub fn element_type(&self, name: &str) -> Option<&ElementTypeDef> {
        self.element_types.iter().find(|e| e.name == name)
    }

    pub fn add_function(&mut self, func: MirFunction) {
        self.function_index
            .insert(func.name.clone(), self.functions.len());
        self.functions.push(func);
    }

    pub fn function(&self, name: &str) -> Option<&MirFunction> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    pub fn add_global(&mut self, global: GlobalVar) {
        self.globals.push(global);
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVar> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Whether `name` is a global property array (device resident).
    pub fn is_property_array(&self, name: &str) -> bool {
        self.global(name)
            .map(|g| g.ty.is_property_array())
            .unwrap_or(false)
    }

    /// The scalar type stored in a property array, when known.
    pub fn property_scalar(&self, name: &str) -> Option<&MirType> {
        match &self.global(name)?.ty {
            MirType::Vector { scalar, .. } => Some(scalar),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::ScalarKind;

    #[test]
    fn function_registry_preserves_order_and_lookup() {
        let mut ctx = MirContext::new(BackendConfig::default());
        ctx.add_function(MirFunction {
            name: "a".into(),
            params: vec![],
            results: vec![],
            body: Some(vec![]),
            exported: false,
        });
        ctx.add_function(MirFunction {
            name: "b".into(),
            params: vec![],
            results: vec![],
            body: None,
            exported: true,
        });
        assert_eq!(ctx.functions[0].name, "a");
        assert!(ctx.function("b").is_some());
        assert!(ctx.function("c").is_none());
    }

    #[test]
    fn property_array_lookup() {
        let mut ctx = MirContext::new(BackendConfig::default());
        ctx.add_global(GlobalVar {
            name: "rank".into(),
            ty: MirType::Vector {
                element: Some("Vertex".into()),
                scalar: Box::new(MirType::Scalar(ScalarKind::Float)),
                size: None,
            },
            init: None,
            is_const: true,
        });
        ctx.add_global(GlobalVar {
            name: "n".into(),
            ty: MirType::Scalar(ScalarKind::Int),
            init: None,
            is_const: true,
        });
        assert!(ctx.is_property_array("rank"));
        assert!(!ctx.is_property_array("n"));
        assert_eq!(
            ctx.property_scalar("rank"),
            Some(&MirType::Scalar(ScalarKind::Float))
        );
    }
}
