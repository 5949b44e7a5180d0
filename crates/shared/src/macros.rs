// crates/shared/src/macros.rs

/// Declares the tools of a toolbelt type and implements [`crate::Toolbelt`]
/// for it. Generates a lazily built `INSTANCE` (via `Default`) and the
/// static `TOOL_SCHEMAS` in the calling module.
///
/// A parameter with `= "value"` is optional and advertises that default.
#[macro_export]
macro_rules! register_toolbelt {
    (
        $toolbelt_type:ident {
            description: $toolbelt_desc:literal,
            tools: {
                $(
                    $name:literal => $method:ident {
                        description: $desc:literal,
                        params: [$($param_name:literal: $param_type:literal => $param_desc:literal $(= $default:literal)?),* $(,)?]
                    }
                ),* $(,)?
            }
        }
    ) => {
        pub static INSTANCE: $crate::once_cell::sync::Lazy<std::sync::Arc<$toolbelt_type>> =
            $crate::once_cell::sync::Lazy::new(|| std::sync::Arc::new(<$toolbelt_type>::default()));

        pub static TOOL_SCHEMAS: $crate::once_cell::sync::Lazy<Vec<$crate::schemas::ToolSchema>> =
            $crate::once_cell::sync::Lazy::new(|| vec![
                $(
                    $crate::schemas::ToolSchema {
                        name: $name,
                        toolbelt: stringify!($toolbelt_type),
                        description: $desc,
                        parameters: vec![
                            $(
                                $crate::schemas::ParameterSchema {
                                    name: $param_name,
                                    type_name: $param_type,
                                    description: $param_desc,
                                    required: $crate::__param_required!($($default)?),
                                    default: $crate::__param_default!($($default)?),
                                }
                            ),*
                        ],
                    }
                ),*
            ]);

        #[$crate::async_trait]
        impl $crate::schemas::Toolbelt for $toolbelt_type {
            fn name(&self) -> &'static str {
                stringify!($toolbelt_type)
            }

            fn description(&self) -> &'static str {
                $toolbelt_desc
            }

            fn schemas(&self) -> &[$crate::schemas::ToolSchema] {
                &TOOL_SCHEMAS
            }

            async fn call(&self, tool: &str, args: &serde_json::Value) -> anyhow::Result<String> {
                match tool {
                    $($name => self.$method(args).await,)*
                    other => Err($crate::schemas::ToolError::NotFound(other.to_string()).into()),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __param_required {
    () => {
        true
    };
    ($default:literal) => {
        false
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __param_default {
    () => {
        None
    };
    ($default:literal) => {
        Some($default)
    };
}
