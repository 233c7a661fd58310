//! Compact module representation consumed by the indexer and pruned by the
//! elimination pass.
//!
//! This is the seam to the host compiler: a module exposes its functions
//! with iterable instructions, its dispatch tables, and its key-path
//! property descriptors, all by canonical symbol name. Only the features
//! the summary pipeline inspects are modeled.

/// Declaring context of an abstract method referenced by a key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodContext {
    Class,
    Protocol,
}

/// Reference to an abstract method requirement by mangled name.
#[derive(Debug, Clone)]
pub struct MethodRef {
    pub mangled_name: String,
    pub context: MethodContext,
}

/// One component of a key-path pattern: the functions and abstract methods
/// it references.
#[derive(Debug, Clone, Default)]
pub struct KeyPathComponent {
    pub functions: Vec<String>,
    pub methods: Vec<MethodRef>,
}

/// The instruction forms the indexer classifies. Each instruction yields at
/// most one call-graph edge, except key paths which expand per component.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Static reference to a concrete function.
    FunctionRef { callee: String },
    /// Witness-method reference; operand is the mangled requirement.
    WitnessMethod { method: String },
    /// Class-method (vtable) reference; operand is the mangled requirement.
    ClassMethod { method: String },
    /// Key-path instruction with its components.
    KeyPath { components: Vec<KeyPathComponent> },
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub instructions: Vec<Instruction>,
    /// Callable through a foreign (C-ABI / foreign-object) convention.
    pub has_foreign_convention: bool,
    /// Referenced from C-visible declarations.
    pub has_c_references: bool,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            instructions: Vec::new(),
            has_foreign_convention: false,
            has_c_references: false,
        }
    }
}

/// Kind of the method declaration a vtable entry implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Normal,
    /// Reachable from runtime release, never from the call graph.
    Deallocator,
    IvarDestroyer,
}

#[derive(Debug, Clone)]
pub struct VTableEntry {
    /// Mangled declaration reference of the method requirement.
    pub method: String,
    /// Name of the implementing function.
    pub implementation: String,
    pub kind: MethodKind,
    /// Entry overrides a method of a superclass.
    pub is_override: bool,
    /// The overridden method is declared outside this module.
    pub method_is_external: bool,
}

#[derive(Debug, Clone)]
pub struct VTable {
    pub class_name: String,
    pub entries: Vec<VTableEntry>,
}

#[derive(Debug, Clone)]
pub struct WitnessTableEntry {
    /// Mangled requirement of the protocol method.
    pub requirement: String,
    /// Implementing function, if the conformance provides one.
    pub witness: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WitnessTable {
    pub protocol_name: String,
    /// Protocol or conforming declaration is defined in another module.
    pub is_external: bool,
    pub entries: Vec<WitnessTableEntry>,
}

#[derive(Debug, Clone)]
pub struct DefaultWitnessTable {
    pub protocol_name: String,
    /// One slot per requirement; `None` marks an already-cleared slot.
    pub entries: Vec<Option<String>>,
}

/// Key-path property descriptor.
#[derive(Debug, Clone)]
pub struct Property {
    pub component: Option<KeyPathComponent>,
}

/// A module under compilation, reduced to what the summary pipeline needs.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub vtables: Vec<VTable>,
    pub witness_tables: Vec<WitnessTable>,
    pub default_witness_tables: Vec<DefaultWitnessTable>,
    pub properties: Vec<Property>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            functions: Vec::new(),
            vtables: Vec::new(),
            witness_tables: Vec::new(),
            default_witness_tables: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Drop the body of `name` and remove it from the module. Returns false
    /// when no such function exists.
    pub fn erase_function(&mut self, name: &str) -> bool {
        match self.functions.iter().position(|f| f.name == name) {
            Some(pos) => {
                self.functions[pos].instructions.clear();
                self.functions.remove(pos);
                true
            }
            None => false,
        }
    }
}
