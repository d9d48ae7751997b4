//! `#[derive(ConfigValidator)]` for the sar-ocr model and dataset configs.

use darling::{FromDeriveInput, FromField, FromMeta, ast};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, Expr, parse_macro_input};

/// Inclusive bounds of `range(..)`.
#[derive(Debug, FromMeta)]
struct RangeArgs {
    min: Expr,
    max: Expr,
}

/// Rules that can sit in a field's `#[validate(..)]`.
#[derive(Debug, Default, FromMeta)]
struct Validators {
    /// Inclusive bounds.
    #[darling(default)]
    range: Option<RangeArgs>,

    /// Lower bound.
    #[darling(default)]
    min: Option<Expr>,

    /// The `PathBuf` must exist.
    #[darling(default)]
    path: bool,

    /// The `Option<PathBuf>` must exist when set.
    #[darling(default)]
    optional_path: bool,
}

#[derive(Debug, FromField)]
#[darling(attributes(validate))]
struct ValidatedField {
    ident: Option<syn::Ident>,
    #[darling(flatten)]
    validators: Validators,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(validate), supports(struct_named))]
struct ConfigValidatorInput {
    ident: syn::Ident,
    data: ast::Data<(), ValidatedField>,
}

/// Implements `crate::core::config::ConfigValidator` for a named struct.
///
/// Each annotated field is checked in declaration order and the first
/// failure is returned as `ConfigError::InvalidConfig` (or `PathNotFound`
/// for the path rules). `get_defaults` is `Default::default`.
///
/// Field rules: `range(min = .., max = ..)`, `min = ..`, `path` and
/// `optional_path`.
///
/// # Example
///
/// ```rust,ignore
/// use sar_ocr_derive::ConfigValidator;
///
/// #[derive(ConfigValidator, Default)]
/// pub struct EncoderConfig {
///     #[validate(min = 1)]
///     pub hidden_units: usize,
///
///     #[validate(range(min = f64::EPSILON, max = 1.0))]
///     pub keep_prob: f64,
///
///     pub bidirectional: bool,
/// }
/// ```
#[proc_macro_derive(ConfigValidator, attributes(validate))]
pub fn derive_config_validator(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    ConfigValidatorInput::from_derive_input(&input)
        .and_then(|parsed| generate_config_validator(&parsed))
        .unwrap_or_else(|err| err.write_errors())
        .into()
}

fn generate_config_validator(
    input: &ConfigValidatorInput,
) -> darling::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let fields = input
        .data
        .as_ref()
        .take_struct()
        .ok_or_else(|| darling::Error::custom("ConfigValidator only supports named structs"))?;

    let validations: Vec<_> = fields
        .iter()
        .filter_map(|field| generate_field_validation(field))
        .collect();

    Ok(quote! {
        impl crate::core::config::ConfigValidator for #name {
            fn validate(&self) -> Result<(), crate::core::config::ConfigError> {
                #(#validations)*
                Ok(())
            }

            fn get_defaults() -> Self
            where
                Self: Sized,
            {
                Self::default()
            }
        }
    })
}

fn generate_field_validation(field: &ValidatedField) -> Option<proc_macro2::TokenStream> {
    let field_name = field.ident.as_ref()?;
    let field_name_str = field_name.to_string();
    let validators = &field.validators;

    let mut validations = Vec::new();

    if let Some(range) = &validators.range {
        let min_expr = &range.min;
        let max_expr = &range.max;
        validations.push(quote! {
            if !(#min_expr..=#max_expr).contains(&self.#field_name) {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!(
                        "{} must be between {} and {}, got {}",
                        #field_name_str,
                        #min_expr,
                        #max_expr,
                        self.#field_name
                    ),
                });
            }
        });
    }

    if let Some(min_expr) = &validators.min {
        validations.push(quote! {
            if self.#field_name < #min_expr {
                return Err(crate::core::config::ConfigError::InvalidConfig {
                    message: format!(
                        "{} must be at least {}, got {}",
                        #field_name_str,
                        #min_expr,
                        self.#field_name
                    ),
                });
            }
        });
    }

    if validators.path {
        validations.push(quote! {
            self.validate_existing_path(&self.#field_name)?;
        });
    }

    if validators.optional_path {
        validations.push(quote! {
            if let Some(ref path) = self.#field_name {
                self.validate_existing_path(path)?;
            }
        });
    }

    if validations.is_empty() {
        None
    } else {
        Some(quote! { #(#validations)* })
    }
}
