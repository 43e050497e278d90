use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod searchable;

/// Declare a search whitelist from a struct.
///
/// Every named field becomes a searchable field. The cast is inferred from the
/// field type (`Option<T>` unwraps to `T`) unless `#[search(cast = "...")]`
/// overrides it.
///
/// Container attributes: `default_sort`, `max_page_size`, `min_page_size`,
/// `page_size_param`, `table`, `strict`, `keep_empty`.
/// Field attributes: `alias`, `rename`, `cast`, `no_sort`, `skip`.
///
/// ```text
/// #[derive(Searchable, Default)]
/// #[search(table = "users", default_sort = "-id", max_page_size = 50)]
/// struct UserFilters {
///     name: Option<String>,
///     #[search(alias = "state")]
///     status: Option<String>,
///     #[search(no_sort)]
///     age: Option<u32>,
///     #[search(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Searchable, attributes(search))]
pub fn derive_searchable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match searchable::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
