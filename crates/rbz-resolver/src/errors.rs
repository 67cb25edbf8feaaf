//! Diagnostic codes emitted by the resolver.

pub const STUB_CONSTANT: u32 = 5001;
pub const DYNAMIC_CONSTANT: u32 = 5002;
pub const CONSTANT_IN_TYPE_ALIAS: u32 = 5003;
pub const RECURSIVE_TYPE_ALIAS: u32 = 5004;
pub const RECURSIVE_CLASS_ALIAS: u32 = 5005;
pub const REASSIGNS_TYPE_ALIAS: u32 = 5006;
pub const DYNAMIC_SUPERCLASS: u32 = 5007;
pub const CIRCULAR_DEPENDENCY: u32 = 5008;
pub const REDEFINITION_OF_PARENTS: u32 = 5009;
pub const INVALID_TYPE_ALIAS: u32 = 5010;
pub const TYPE_ALIAS_IN_GENERIC_CLASS: u32 = 5011;
pub const INVALID_METHOD_SIGNATURE: u32 = 5012;
pub const OVERLOAD_NOT_ALLOWED: u32 = 5013;
pub const BAD_PARAMETER_ORDERING: u32 = 5014;
pub const SIG_IN_FILE_WITHOUT_SIGIL: u32 = 5015;
pub const ABSTRACT_METHOD_WITH_BODY: u32 = 5016;
pub const ABSTRACT_METHOD_OUTSIDE_ABSTRACT: u32 = 5017;
pub const CONCRETE_METHOD_IN_INTERFACE: u32 = 5018;
pub const INVALID_MIXIN_DECLARATION: u32 = 5019;
pub const CONSTANT_ASSERT_TYPE: u32 = 5020;
pub const CONSTANT_MISSING_TYPE_ANNOTATION: u32 = 5021;
pub const DUPLICATE_VARIABLE_DECLARATION: u32 = 5022;
pub const INVALID_DECLARE_VARIABLES: u32 = 5023;
pub const PARENT_TYPE_BOUNDS_MISMATCH: u32 = 5024;
pub const INVALID_TYPE_MEMBER_BOUNDS: u32 = 5025;
pub const BAD_ALIAS_METHOD: u32 = 5026;
pub const REVEAL_TYPE_IN_UNTYPED_FILE: u32 = 5027;
pub const INVALID_TYPE_DECLARATION: u32 = 5028;
