use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DeriveInput, Error, Fields, GenericArgument, LitBool, LitInt, LitStr, PathArguments, Result, Token,
    Type, TypePath,
};

#[derive(Default)]
struct ContainerAttrs {
    default_sort: Option<LitStr>,
    max_page_size: Option<LitInt>,
    min_page_size: Option<LitInt>,
    page_size_param: Option<LitStr>,
    table: Option<LitStr>,
    strict: bool,
    keep_empty: bool,
}

#[derive(Default)]
struct FieldAttrs {
    alias: Option<LitStr>,
    rename: Option<LitStr>,
    cast: Option<LitStr>,
    no_sort: bool,
    skip: bool,
}

struct SearchField<'a> {
    ident: &'a syn::Ident,
    ty: &'a Type,
    name: String,
    attrs: FieldAttrs,
}

pub(crate) fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(Error::new_spanned(input, "Searchable only supports structs with named fields")),
        },
        _ => return Err(Error::new_spanned(input, "Searchable can only be derived for structs")),
    };

    let container = parse_container_attrs(&input.attrs)?;

    let mut search_fields = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        let name = match &attrs.rename {
            Some(rename) => rename.value(),
            None => ident.to_string().trim_start_matches("r#").to_string(),
        };
        search_fields.push(SearchField {
            ident,
            ty: &field.ty,
            name,
            attrs,
        });
    }

    if !search_fields.iter().any(|field| !field.attrs.skip) {
        return Err(Error::new_spanned(input, "Searchable needs at least one field that is not skipped"));
    }

    let container_calls = container_calls(&container);
    let field_specs = search_fields.iter().filter(|field| !field.attrs.skip).map(field_spec);
    let field_inits = search_fields.iter().map(field_init);

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::sift::Searchable for #struct_name #ty_generics #where_clause {
            fn search_schema() -> ::core::result::Result<::sift::SearchSchema, ::sift::SearchError> {
                ::sift::SearchSchema::builder()
                    #(#container_calls)*
                    #(.field(#field_specs))*
                    .build()
            }

            fn from_accepted(
                accepted: &::sift::AcceptedAttributes,
            ) -> ::core::result::Result<Self, ::sift::SearchError> {
                ::core::result::Result::Ok(Self {
                    #(#field_inits,)*
                })
            }
        }
    })
}

fn parse_container_attrs(attrs: &[Attribute]) -> Result<ContainerAttrs> {
    let mut parsed = ContainerAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("search")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default_sort") {
                parsed.default_sort = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("max_page_size") {
                let size: LitInt = meta.value()?.parse()?;
                if size.base10_parse::<u64>()? == 0 {
                    return Err(Error::new_spanned(&size, "max_page_size must be greater than zero"));
                }
                parsed.max_page_size = Some(size);
            } else if meta.path.is_ident("min_page_size") {
                let size: LitInt = meta.value()?.parse()?;
                size.base10_parse::<u64>()?;
                parsed.min_page_size = Some(size);
            } else if meta.path.is_ident("page_size_param") {
                parsed.page_size_param = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("table") {
                parsed.table = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("strict") {
                parsed.strict = parse_flag(&meta)?;
            } else if meta.path.is_ident("keep_empty") {
                parsed.keep_empty = parse_flag(&meta)?;
            } else {
                return Err(meta.error(
                    "unknown search attribute; expected one of default_sort, max_page_size, min_page_size, \
                     page_size_param, table, strict, keep_empty",
                ));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("search")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("alias") {
                parsed.alias = Some(non_empty(meta.value()?.parse()?, "alias")?);
            } else if meta.path.is_ident("rename") {
                parsed.rename = Some(non_empty(meta.value()?.parse()?, "rename")?);
            } else if meta.path.is_ident("cast") {
                parsed.cast = Some(non_empty(meta.value()?.parse()?, "cast")?);
            } else if meta.path.is_ident("no_sort") {
                parsed.no_sort = parse_flag(&meta)?;
            } else if meta.path.is_ident("skip") {
                parsed.skip = parse_flag(&meta)?;
            } else {
                return Err(meta.error("unknown search field attribute; expected one of alias, rename, cast, no_sort, skip"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// `flag` or `flag = true|false`.
fn parse_flag(meta: &ParseNestedMeta) -> Result<bool> {
    if meta.input.peek(Token![=]) {
        let value: LitBool = meta.value()?.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

fn non_empty(lit: LitStr, attribute: &str) -> Result<LitStr> {
    if lit.value().trim().is_empty() {
        return Err(Error::new_spanned(&lit, format!("{attribute} cannot be empty")));
    }
    Ok(lit)
}

fn container_calls(container: &ContainerAttrs) -> Vec<TokenStream2> {
    let mut calls = Vec::new();
    if let Some(token) = &container.default_sort {
        calls.push(quote!(.default_sort(#token)));
    }
    if let Some(size) = &container.max_page_size {
        calls.push(quote!(.max_page_size(#size)));
    }
    if let Some(size) = &container.min_page_size {
        calls.push(quote!(.min_page_size(#size)));
    }
    if let Some(param) = &container.page_size_param {
        calls.push(quote!(.page_size_param(#param)));
    }
    if let Some(table) = &container.table {
        calls.push(quote!(.table(#table)));
    }
    if container.strict {
        calls.push(quote!(.strict_casts(true)));
    }
    if container.keep_empty {
        calls.push(quote!(.keep_empty(true)));
    }
    calls
}

fn field_spec(field: &SearchField) -> TokenStream2 {
    let name = &field.name;
    let mut spec = quote!(::sift::FieldSpec::new(#name));

    if let Some(alias) = &field.attrs.alias {
        spec = quote!(#spec.alias(#alias));
    }

    let cast = match &field.attrs.cast {
        Some(cast) => Some(cast.value()),
        None => infer_cast(value_type(field.ty)),
    };
    if let Some(cast) = cast {
        spec = quote!(#spec.cast(#cast.parse::<::sift::CastKind>()?));
    }

    if field.attrs.no_sort {
        spec = quote!(#spec.unsortable());
    }
    spec
}

fn field_init(field: &SearchField) -> TokenStream2 {
    let ident = field.ident;
    let name = &field.name;

    if field.attrs.skip {
        return quote!(#ident: ::core::default::Default::default());
    }

    match option_inner(field.ty) {
        Some(inner) => quote!(#ident: accepted.get_as::<#inner>(#name)?),
        None => {
            let ty = field.ty;
            quote!(#ident: accepted.get_as::<#ty>(#name)?.unwrap_or_default())
        }
    }
}

/// The type a field holds once `Option` is peeled off.
fn value_type(ty: &Type) -> &Type {
    option_inner(ty).unwrap_or(ty)
}

fn option_inner(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Option")
}

fn single_generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn infer_cast(ty: &Type) -> Option<String> {
    if let Some(element) = single_generic_arg(ty, "Vec") {
        return Some(match infer_cast(element) {
            Some(inner) if !inner.starts_with("array") => format!("array<{inner}>"),
            _ => "array".to_string(),
        });
    }

    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };
    let segment = path.segments.last()?;
    let cast = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => "integer",
        "f32" | "f64" => "float",
        "bool" => "boolean",
        "String" => "string",
        "NaiveDate" => "date",
        "DateTime" => "timestamp",
        _ => return None,
    };
    Some(cast.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn casts_follow_field_types() {
        let cases: [(Type, Option<&str>); 7] = [
            (parse_quote!(Option<u32>), Some("integer")),
            (parse_quote!(f64), Some("float")),
            (parse_quote!(Option<chrono::NaiveDate>), Some("date")),
            (parse_quote!(DateTime<Utc>), Some("timestamp")),
            (parse_quote!(Vec<i64>), Some("array<integer>")),
            (parse_quote!(Vec<Vec<String>>), Some("array")),
            (parse_quote!(serde_json::Value), None),
        ];
        for (ty, expected) in cases {
            assert_eq!(infer_cast(value_type(&ty)).as_deref(), expected);
        }
    }

    #[test]
    fn unknown_attributes_are_rejected() {
        let input: DeriveInput = parse_quote! {
            #[search(per_page = 10)]
            struct Filters {
                name: Option<String>,
            }
        };
        let err = expand(&input).err().map(|err| err.to_string()).unwrap_or_default();
        assert!(err.contains("unknown search attribute"));
    }

    #[test]
    fn all_skipped_fields_are_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Filters {
                #[search(skip)]
                name: Option<String>,
            }
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn expansion_references_the_runtime_crate() {
        let input: DeriveInput = parse_quote! {
            #[search(table = "users", strict)]
            struct Filters {
                #[search(alias = "state", no_sort)]
                status: Option<String>,
            }
        };
        let tokens = expand(&input).map(|tokens| tokens.to_string()).unwrap_or_default();
        assert!(tokens.contains("impl :: sift :: Searchable for Filters"));
        assert!(tokens.contains(". strict_casts (true)"));
        assert!(tokens.contains(". unsortable ()"));
    }
}
