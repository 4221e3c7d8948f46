//! The fixed C ABI of the linked runtime library.
//!
//! The emitted program includes `<not_python.h>` and links `-lnot_python`.
//! Everything here is dictated by that ABI; the compiler never invents
//! runtime names elsewhere.

/// Name of the emitted module-level string constant table.
pub const STRING_CONSTANTS_TABLE: &str = "NOT_PYTHON_STRING_CONSTANTS";

/// Runtime header included by every emitted translation unit.
pub const RUNTIME_HEADER: &str = "not_python.h";

// C type names.
pub const TYPE_INT: &str = "NpInt";
pub const TYPE_FLOAT: &str = "NpFloat";
pub const TYPE_STRING: &str = "NpString";
pub const TYPE_BOOL: &str = "NpBool";
pub const TYPE_BYTE: &str = "NpByte";
pub const TYPE_LIST: &str = "NpList*";
pub const TYPE_DICT: &str = "NpDict*";
pub const TYPE_ITER: &str = "NpIter";
pub const TYPE_FUNCTION: &str = "NpFunction";
pub const TYPE_CONTEXT: &str = "NpContext";
pub const TYPE_EXCEPTION: &str = "Exception*";
pub const TYPE_NONE: &str = "NpNone";
pub const TYPE_POINTER: &str = "NpPointer";
pub const TYPE_UNSIGNED: &str = "NpUnsigned";
pub const TYPE_DICT_ITEMS: &str = "DictItem";
pub const TYPE_CSTR: &str = "char*";

// Allocation.
pub const ALLOC: &str = "np_alloc";
pub const FREE: &str = "np_free";

// Print.
pub const PRINT: &str = "builtin_print";

// List builtins.
pub const LIST_APPEND: &str = "np_list_append";
pub const LIST_CLEAR: &str = "np_list_clear";
pub const LIST_COUNT: &str = "np_list_count";
pub const LIST_EXTEND: &str = "np_list_extend";
pub const LIST_INDEX: &str = "np_list_index";
pub const LIST_INSERT: &str = "np_list_insert";
pub const LIST_POP: &str = "np_list_pop";
pub const LIST_REMOVE: &str = "np_list_remove";
pub const LIST_REVERSE: &str = "np_list_reverse";
pub const LIST_SORT: &str = "np_list_sort";
pub const LIST_COPY: &str = "np_list_copy";
pub const LIST_GET_ITEM: &str = "np_list_get_item";
pub const LIST_SET_ITEM: &str = "np_list_set_item";
pub const LIST_ADD: &str = "np_list_add";
pub const LIST_INIT: &str = "np_list_init";
pub const LIST_ITER: &str = "np_list_iter";

// Dict builtins.
pub const DICT_CLEAR: &str = "np_dict_clear";
pub const DICT_COPY: &str = "np_dict_copy";
pub const DICT_ITEMS: &str = "np_dict_iter_items";
pub const DICT_KEYS: &str = "np_dict_iter_keys";
pub const DICT_VALUES: &str = "np_dict_iter_vals";
pub const DICT_POP: &str = "np_dict_pop_val";
pub const DICT_UPDATE: &str = "np_dict_update";
pub const DICT_GET_ITEM: &str = "np_dict_get_val";
pub const DICT_INIT: &str = "np_dict_init";
pub const DICT_SET_ITEM: &str = "np_dict_set_item";

// String operations.
pub const STR_ADD: &str = "np_str_add";
pub const STR_EQ: &str = "np_str_eq";
pub const STR_GT: &str = "np_str_gt";
pub const STR_GTE: &str = "np_str_gte";
pub const STR_LT: &str = "np_str_lt";
pub const STR_LTE: &str = "np_str_lte";
pub const STR_TO_CSTR: &str = "np_str_to_cstr";
pub const STR_FMT: &str = "np_str_fmt";

// Conversions to string.
pub const INT_TO_STR: &str = "np_int_to_str";
pub const FLOAT_TO_STR: &str = "np_float_to_str";
pub const BOOL_TO_STR: &str = "np_bool_to_str";

// Exceptions.
pub const GLOBAL_EXCEPTION: &str = "global_exception";
pub const CURRENT_EXCEPTS: &str = "current_excepts";
pub const CURRENT_EXCEPTS_CTYPE: &str = "uint64_t";
pub const GET_EXCEPTION: &str = "get_exception";
pub const ASSERTION_ERROR: &str = "assertion_error";

// libm routines routed by the lowering engine.
pub const FMOD: &str = "fmod";
pub const POW: &str = "pow";

// Element comparison/sort functions for container initialization. Entries
// exist only for int/float/bool/string; everything else is compiled as NULL.
pub const VOID_INT_EQ: &str = "np_void_int_eq";
pub const VOID_FLOAT_EQ: &str = "np_void_float_eq";
pub const VOID_BOOL_EQ: &str = "np_void_bool_eq";
pub const VOID_STR_EQ: &str = "np_void_str_eq";

pub const INT_SORT: &str = "np_int_sort_fn";
pub const FLOAT_SORT: &str = "np_float_sort_fn";
pub const BOOL_SORT: &str = "np_bool_sort_fn";
pub const STR_SORT: &str = "np_str_sort_fn";
pub const INT_SORT_REV: &str = "np_int_sort_fn_rev";
pub const FLOAT_SORT_REV: &str = "np_float_sort_fn_rev";
pub const BOOL_SORT_REV: &str = "np_bool_sort_fn_rev";
pub const STR_SORT_REV: &str = "np_str_sort_fn_rev";

/// Exception class bit flags carried in `current_excepts` and
/// `Exception.type`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u64)]
pub enum ExceptionFlag {
    MemoryError = 1 << 0,
    IndexError = 1 << 1,
    ValueError = 1 << 2,
    KeyError = 1 << 3,
    AssertionError = 1 << 4,
}

impl ExceptionFlag {
    /// Map a source-level exception class name to its flag.
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "MemoryError" => Some(Self::MemoryError),
            "IndexError" => Some(Self::IndexError),
            "ValueError" => Some(Self::ValueError),
            "KeyError" => Some(Self::KeyError),
            "AssertionError" => Some(Self::AssertionError),
            _ => None,
        }
    }

    #[inline]
    pub fn bit(self) -> u64 {
        self as u64
    }
}
