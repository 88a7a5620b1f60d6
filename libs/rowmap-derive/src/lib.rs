use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprArray, ExprLit, Fields, GenericArgument, Lit, LitStr,
    Path, PathArguments, Type, parse_macro_input,
};

/// Derive `rowmap::Record` for a struct with named fields.
///
/// Only annotated fields take part in the schema:
///
/// - `#[field]`: a value field, codec inferred from its type.
/// - `#[field(name = "..", codec = "scalar" | "enum" | "datetime" | "uuid",
///   codec_with = path::to::factory, args = ["..", ..])]`: overrides.
/// - `#[field(nested)]`: a whole record in one column, written as its own
///   row joined by `,` or by the single `args` delimiter.
/// - `#[embedded]`, `#[embedded(prefix = "..")]`, `#[embedded(no_prefix)]`:
///   flatten a nested record. An `Option<T>` field is filled with
///   `T::default()` the first time one of its leaves is set.
///
/// `#[record(name = "..")]` on the struct overrides the reported type name.
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Default)]
/// pub struct Event {
///     #[field(name = "eventDate", args = "yyyy-MM-dd HH:mm:ss")]
///     pub at: Option<NaiveDateTime>,
///
///     #[field]
///     pub count: i32,
///
///     #[embedded(prefix = "src_")]
///     pub source: Option<Source>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record, field, embedded))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match record_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Derive `rowmap::EnumValue` and `rowmap::FieldValue` for a fieldless enum.
///
/// The enum must also derive `Clone`, `Copy` and `PartialEq`.
/// `#[variant(name = "..")]` overrides a constant's symbolic name; any other
/// `key = value` pair becomes a constant-level attribute, usable as the enum
/// codec's key via `#[field(args = "key")]`.
#[proc_macro_derive(RecordEnum, attributes(record, variant))]
pub fn derive_record_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match enum_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

// ════════════════════════════════════════════════════════════════
//  #[derive(Record)]
// ════════════════════════════════════════════════════════════════

fn record_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let type_name = type_name_override(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record only supports structs with named fields",
                ));
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Record only supports structs")),
    };

    let mut declarations = Vec::new();
    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_str = ident.unraw().to_string();
        let ty = &field.ty;

        let value_attr = field.attrs.iter().find(|a| a.path().is_ident("field"));
        let embedded_attr = field.attrs.iter().find(|a| a.path().is_ident("embedded"));

        match (value_attr, embedded_attr) {
            (Some(_), Some(attr)) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "a field can't be both #[field] and #[embedded]",
                ));
            }
            (Some(attr), None) => {
                let ValueAttr { modifiers, nested } = value_attr_of(attr)?;
                let declaration = match (nested, option_inner(ty)) {
                    (false, _) => quote! {
                        decl.field::<#ty>(#field_str, |r| &r.#ident, |r| &mut r.#ident) #modifiers;
                    },
                    (true, Some(inner)) => quote! {
                        decl.nested::<#inner>(
                            #field_str,
                            |r| r.#ident.as_ref(),
                            |r| r.#ident.get_or_insert_with(::core::default::Default::default),
                        ) #modifiers;
                    },
                    (true, None) => quote! {
                        decl.nested::<#ty>(
                            #field_str,
                            |r| ::core::option::Option::Some(&r.#ident),
                            |r| &mut r.#ident,
                        ) #modifiers;
                    },
                };
                declarations.push(declaration);
            }
            (None, Some(attr)) => {
                let prefix = embedded_prefix(attr)?;
                let declaration = match option_inner(ty) {
                    Some(inner) => quote! {
                        decl.embedded::<#inner>(
                            #field_str,
                            |r| r.#ident.as_ref(),
                            |r| r.#ident.get_or_insert_with(::core::default::Default::default),
                            #prefix,
                        );
                    },
                    None => quote! {
                        decl.embedded::<#ty>(
                            #field_str,
                            |r| ::core::option::Option::Some(&r.#ident),
                            |r| &mut r.#ident,
                            #prefix,
                        );
                    },
                };
                declarations.push(declaration);
            }
            (None, None) => {}
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::rowmap::declare::Record for #name #ty_generics #where_clause {
            fn type_name() -> &'static str {
                #type_name
            }

            fn declare(decl: &mut ::rowmap::declare::RecordDecl<Self>) {
                #(#declarations)*
            }
        }
    })
}

struct ValueAttr {
    /// Chained `.name(..)`, `.codec(..)`, `.args(..)` calls.
    modifiers: TokenStream2,
    nested: bool,
}

fn value_attr_of(attr: &Attribute) -> Result<ValueAttr, syn::Error> {
    let mut name: Option<LitStr> = None;
    let mut codec: Option<TokenStream2> = None;
    let mut args: Vec<LitStr> = Vec::new();
    let mut nested = false;

    // Bare `#[field]` carries no list.
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(ValueAttr {
            modifiers: TokenStream2::new(),
            nested,
        });
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("nested") {
            nested = true;
        } else if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("codec") {
            let value: LitStr = meta.value()?.parse()?;
            let variant = match value.value().as_str() {
                "scalar" => quote! { Scalar },
                "enum" => quote! { Enum },
                "datetime" | "date" => quote! { DateTime },
                "uuid" => quote! { Uuid },
                other => {
                    return Err(meta.error(format!(
                        "unknown codec '{other}' (expected scalar, enum, datetime or uuid)"
                    )));
                }
            };
            codec = Some(quote! { ::rowmap::codec::CodecKind::#variant });
        } else if meta.path.is_ident("codec_with") {
            let factory: Path = meta.value()?.parse()?;
            codec = Some(quote! { ::rowmap::codec::CodecKind::Custom(#factory) });
        } else if meta.path.is_ident("args") {
            args = match meta.value()?.parse::<Expr>()? {
                Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => vec![s],
                Expr::Array(ExprArray { elems, .. }) => elems
                    .into_iter()
                    .map(|e| match e {
                        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => Ok(s),
                        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
                    })
                    .collect::<Result<_, _>>()?,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected a string or an array of strings",
                    ));
                }
            };
        } else {
            return Err(meta.error("unknown #[field] option"));
        }
        Ok(())
    })?;

    if nested && codec.is_some() {
        return Err(syn::Error::new_spanned(attr, "a nested field always uses the record codec"));
    }

    let mut tokens = TokenStream2::new();
    if let Some(name) = name {
        tokens.extend(quote! { .name(#name) });
    }
    if let Some(codec) = codec {
        tokens.extend(quote! { .codec(#codec) });
    }
    if !args.is_empty() {
        tokens.extend(quote! { .args([#(#args),*]) });
    }
    Ok(ValueAttr {
        modifiers: tokens,
        nested,
    })
}

fn embedded_prefix(attr: &Attribute) -> Result<TokenStream2, syn::Error> {
    let mut prefix = quote! { ::rowmap::declare::Prefix::Inherit };
    if matches!(attr.meta, syn::Meta::Path(_)) {
        return Ok(prefix);
    }
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("prefix") {
            let value: LitStr = meta.value()?.parse()?;
            prefix = quote! { ::rowmap::declare::Prefix::Explicit(#value.to_string()) };
        } else if meta.path.is_ident("no_prefix") {
            prefix = quote! { ::rowmap::declare::Prefix::None };
        } else {
            return Err(meta.error("unknown #[embedded] option"));
        }
        Ok(())
    })?;
    Ok(prefix)
}

/// `T` for a field typed `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn type_name_override(attrs: &[Attribute]) -> Result<Option<String>, syn::Error> {
    let mut name = None;
    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown #[record] option"))
            }
        })?;
    }
    Ok(name)
}

// ════════════════════════════════════════════════════════════════
//  #[derive(RecordEnum)]
// ════════════════════════════════════════════════════════════════

fn enum_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;
    let enum_name = type_name_override(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "RecordEnum only supports enums"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(name, "RecordEnum needs at least one variant"));
    }

    let mut constants = Vec::new();
    let mut name_arms = Vec::new();
    let mut attribute_arms = Vec::new();
    for variant in &data.variants {
        let ident = &variant.ident;
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "RecordEnum only supports unit variants",
            ));
        }

        let mut symbol = ident.to_string();
        for attr in variant.attrs.iter().filter(|a| a.path().is_ident("variant")) {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a plain attribute key"))?
                    .to_string();
                let value = literal_text(&meta.value()?.parse()?)
                    .ok_or_else(|| meta.error("expected a string, number or bool literal"))?;
                if key == "name" {
                    symbol = value;
                } else {
                    attribute_arms.push(quote! {
                        (Self::#ident, #key) => ::core::option::Option::Some(#value.to_string()),
                    });
                }
                Ok(())
            })?;
        }

        constants.push(quote! { Self::#ident });
        name_arms.push(quote! { Self::#ident => #symbol, });
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::rowmap::value::EnumValue for #name #ty_generics #where_clause {
            fn enum_name() -> &'static str {
                #enum_name
            }

            fn variants() -> &'static [Self] {
                &[#(#constants),*]
            }

            fn variant_name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            fn attribute(&self, key: &str) -> ::core::option::Option<::std::string::String> {
                match (self, key) {
                    #(#attribute_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::rowmap::value::FieldValue for #name #ty_generics #where_clause {
            fn kind() -> ::rowmap::value::ValueKind {
                ::rowmap::value::enum_kind::<Self>()
            }

            fn to_value(&self) -> ::rowmap::value::Value {
                ::rowmap::value::enum_to_value(self)
            }

            fn from_value(
                value: ::rowmap::value::Value,
            ) -> ::core::result::Result<Self, ::rowmap::error::CodecError> {
                ::rowmap::value::enum_from_value(value)
            }
        }
    })
}

fn literal_text(lit: &Lit) -> Option<String> {
    match lit {
        Lit::Str(s) => Some(s.value()),
        Lit::Int(i) => Some(i.base10_digits().to_string()),
        Lit::Float(f) => Some(f.base10_digits().to_string()),
        Lit::Bool(b) => Some(b.value.to_string()),
        Lit::Char(c) => Some(c.value().to_string()),
        _ => None,
    }
}
