//! Procedural macros for infuse.
//!
//! Use through the `infuse` crate, which re-exports them.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Generics, Meta, PathArguments, Type, parse_macro_input,
    parse_quote,
};

/// Options of an `#[inject(...)]` field attribute.
#[derive(Debug, Default, FromMeta)]
struct InjectOptions {
    /// Resolve a named binding instead of the plain type key.
    #[darling(default)]
    name: Option<String>,
}

/// Derives `infuse::Injectable` for a struct with named fields.
///
/// - `#[inject]` on an `Arc<T>` field declares a dependency on `T`.
/// - `#[inject(name = "primary")]` declares a dependency on the named
///   binding `primary` of `T`.
/// - Every other field is initialized with `Default::default()`.
///
/// The generated initializer takes no arguments (`Args = ()`). Type
/// parameters get a `Send + Sync + 'static` bound; lifetime parameters are
/// rejected.
///
/// ```rust,ignore
/// #[derive(Injectable)]
/// struct Newsletter {
///     #[inject]
///     mailer: Arc<Mailer>,
///     #[inject(name = "utc")]
///     clock: Arc<Clock>,
///     sent: u64,
/// }
/// ```
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(|err| err.write_errors())
        .into()
}

fn expand(input: &DeriveInput) -> darling::Result<TokenStream2> {
    let ident = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(unsupported(input, "a tuple or unit struct")),
        },
        Data::Enum(_) => return Err(unsupported(input, "an enum")),
        Data::Union(_) => return Err(unsupported(input, "a union")),
    };

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(darling::Error::custom(
            "`Injectable` types must be 'static: lifetime parameters are not supported",
        )
        .with_span(lifetime));
    }

    let mut errors = darling::Error::accumulator();
    let mut declarations = Vec::new();
    let mut initializers = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = field_ident.to_string();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("inject")) else {
            initializers.push(quote! {
                #field_ident: ::core::default::Default::default()
            });
            continue;
        };

        let Some(options) = errors.handle(parse_options(&attr.meta)) else {
            continue;
        };
        let Some(dependency) = errors.handle(arc_inner(&field.ty)) else {
            continue;
        };

        declarations.push(match &options.name {
            Some(binding) => quote! { .named_field::<#dependency>(#field_name, #binding) },
            None => quote! { .field::<#dependency>(#field_name) },
        });
        initializers.push(quote! {
            #field_ident: deps.get::<#dependency>(#field_name)?
        });
    }

    errors.finish()?;

    let generics = bounded_generics(&input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::infuse::Injectable for #ident #ty_generics #where_clause {
            type Args = ();

            fn manifest() -> ::infuse::Manifest {
                ::infuse::Manifest::builder::<Self>()
                    #(#declarations)*
                    .build()
            }

            fn initialize(
                deps: ::infuse::Dependencies,
                _args: (),
            ) -> ::infuse::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#initializers,)*
                })
            }
        }
    })
}

fn parse_options(meta: &Meta) -> darling::Result<InjectOptions> {
    match meta {
        Meta::Path(_) => Ok(InjectOptions::default()),
        Meta::List(list) => {
            let nested = NestedMeta::parse_meta_list(list.tokens.clone())?;
            InjectOptions::from_list(&nested).map_err(|e| e.with_span(meta))
        }
        Meta::NameValue(_) => Err(darling::Error::custom(
            "expected `#[inject]` or `#[inject(name = \"...\")]`",
        )
        .with_span(meta)),
    }
}

/// Bounds every type parameter like a registered value, so a non-`'static`
/// argument fails at the use site instead of inside the generated impl.
fn bounded_generics(generics: &Generics) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<_> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote! {
            #param: ::core::marker::Send + ::core::marker::Sync + 'static
        });
    }
    generics
}

/// Extracts `T` from a field typed `Arc<T>`.
fn arc_inner(ty: &Type) -> darling::Result<&Type> {
    let not_arc = || {
        darling::Error::custom("#[inject] fields must be declared as `Arc<T>`").with_span(ty)
    };

    let Type::Path(path) = ty else {
        return Err(not_arc());
    };
    let Some(last) = path.path.segments.last() else {
        return Err(not_arc());
    };
    if last.ident != "Arc" {
        return Err(not_arc());
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return Err(not_arc());
    };

    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Ok(inner),
        _ => Err(not_arc()),
    }
}

fn unsupported(input: &DeriveInput, what: &str) -> darling::Error {
    darling::Error::custom(format!(
        "unsupported injection target `{}`: `Injectable` can only be derived for structs with named fields, not {what}",
        input.ident
    ))
    .with_span(&input.ident)
}
