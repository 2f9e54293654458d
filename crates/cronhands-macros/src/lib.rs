//! # CronHands Macros
//!
//! Attribute macros for declaring job classes.
//!
//! ## Available Macros
//!
//! - `#[job_class]` - Implement `JobClass` for the type of an impl block
//! - `#[job]` - Mark a method of a `#[job_class]` impl block as a job
//! - `#[run_now]` - Fire a job once right after it is registered

use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, FnArg, ImplItem, ImplItemFn, ItemImpl, Type};

/// Job class attribute arguments.
#[derive(Debug, Default, FromMeta)]
struct JobClassArgs {
    /// Function returning `Result<Self, E>`; `Default` is used otherwise.
    #[darling(default)]
    constructor: Option<syn::Path>,
    #[darling(default)]
    namespace: Option<String>,
}

/// Job attribute arguments.
#[derive(Debug, FromMeta)]
struct JobArgs {
    cron: String,
    #[darling(default)]
    group: Option<String>,
    #[darling(multiple, rename = "param")]
    params: Vec<String>,
    #[darling(default)]
    run_now: bool,
    #[darling(default)]
    concurrent: Option<bool>,
    #[darling(default)]
    description: Option<String>,
}

/// A `#[job]` method found in the impl block.
struct JobMethodDef {
    ident: syn::Ident,
    args: JobArgs,
    takes_context: bool,
}

/// Implement `JobClass` for the type of an impl block.
///
/// Every method carrying `#[job(...)]` becomes a job named
/// `TypeName.method_name`. Job methods take `&self` and optionally a
/// `&JobContext`, and return `()` or `Result<(), E>`.
///
/// # Example
///
/// ```ignore
/// use cronhands_core::JobContext;
/// use cronhands_macros::{job, job_class, run_now};
///
/// #[derive(Default)]
/// struct Reports;
///
/// #[job_class(namespace = "app::reports")]
/// impl Reports {
///     #[job(cron = "0 0 12 * * ?", group = "reports", param = "Prod", param = "v1")]
///     fn generate(&self, ctx: &JobContext) -> anyhow::Result<()> {
///         println!("{:?}", ctx.parameters());
///         Ok(())
///     }
///
///     #[job(cron = "0/10 * * * * ?")]
///     #[run_now]
///     fn track(&self) {}
/// }
/// ```
#[proc_macro_attribute]
pub fn job_class(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = match NestedMeta::parse_meta_list(attr.into()) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(e.to_compile_error()),
    };

    let args = match JobClassArgs::from_list(&attr_args) {
        Ok(v) => v,
        Err(e) => return TokenStream::from(e.write_errors()),
    };

    let mut input = parse_macro_input!(item as ItemImpl);

    match expand_job_class(args, &mut input) {
        Ok(v) => TokenStream::from(v),
        Err(e) => TokenStream::from(e.write_errors()),
    }
}

/// Mark a job method. Only valid inside a `#[job_class]` impl block.
#[proc_macro_attribute]
pub fn job(_attr: TokenStream, item: TokenStream) -> TokenStream {
    outside_job_class("job", item)
}

/// Fire a job once after registration. Only valid next to `#[job]`.
#[proc_macro_attribute]
pub fn run_now(_attr: TokenStream, item: TokenStream) -> TokenStream {
    outside_job_class("run_now", item)
}

fn outside_job_class(name: &str, item: TokenStream) -> TokenStream {
    let item = TokenStream2::from(item);
    let message = format!("#[{}] can only be used inside a #[job_class] impl block", name);
    let error = syn::Error::new(Span::call_site(), message).to_compile_error();
    TokenStream::from(quote! {
        #error
        #item
    })
}

fn expand_job_class(args: JobClassArgs, input: &mut ItemImpl) -> darling::Result<TokenStream2> {
    let mut errors = darling::Error::accumulator();

    if let Some((_, path, _)) = &input.trait_ {
        errors.push(
            darling::Error::custom("#[job_class] must be placed on an inherent impl block")
                .with_span(path),
        );
    }
    if !input.generics.params.is_empty() {
        errors.push(
            darling::Error::custom("#[job_class] does not support generic types")
                .with_span(&input.generics),
        );
    }

    let type_name = errors.handle(short_type_name(&input.self_ty));

    let mut methods = Vec::new();
    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            if let Some(def) = errors.handle(take_job_method(method)).flatten() {
                methods.push(def);
            }
        }
    }

    errors.finish()?;

    let self_ty = &input.self_ty;
    let type_name = type_name.unwrap_or_default();
    let method_entries = methods.iter().map(job_method_tokens);

    let construct = match &args.constructor {
        Some(path) => quote! {
            #path().map_err(|e| ::cronhands_core::ConstructError::new(e.to_string()))
        },
        None => quote! {
            ::std::result::Result::Ok(<Self as ::std::default::Default>::default())
        },
    };

    let namespace = args.namespace.as_ref().map(|namespace| {
        let namespace = namespace.trim_matches(':');
        quote! {
            fn namespace() -> &'static str {
                #namespace
            }
        }
    });

    Ok(quote! {
        #input

        impl ::cronhands_core::JobClass for #self_ty {
            fn type_name() -> &'static str {
                #type_name
            }

            #namespace

            fn construct() -> ::std::result::Result<Self, ::cronhands_core::ConstructError> {
                #construct
            }

            fn job_methods() -> ::std::vec::Vec<::cronhands_core::JobMethod<Self>> {
                ::std::vec![#(#method_entries),*]
            }
        }
    })
}

fn short_type_name(ty: &Type) -> darling::Result<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| darling::Error::custom("expected a type name").with_span(ty)),
        _ => Err(darling::Error::custom("#[job_class] requires a named type").with_span(ty)),
    }
}

/// Strip `#[job]` and `#[run_now]` from `method` and check its signature.
fn take_job_method(method: &mut ImplItemFn) -> darling::Result<Option<JobMethodDef>> {
    let mut job_args = None;
    let mut run_now = None;
    let mut errors = darling::Error::accumulator();

    let mut kept = Vec::with_capacity(method.attrs.len());
    for attr in method.attrs.drain(..) {
        if attr.path().is_ident("job") {
            if job_args.is_some() {
                errors.push(darling::Error::custom("duplicate #[job] attribute").with_span(&attr));
                continue;
            }
            job_args = errors.handle(JobArgs::from_meta(&attr.meta));
        } else if attr.path().is_ident("run_now") {
            if let Err(e) = attr.meta.require_path_only() {
                errors.push(e.into());
            }
            run_now = Some(attr);
        } else {
            kept.push(attr);
        }
    }
    method.attrs = kept;

    let Some(mut args) = job_args else {
        if let Some(attr) = run_now {
            errors.push(darling::Error::custom("#[run_now] requires #[job]").with_span(&attr));
        }
        return errors.finish_with(None);
    };
    if run_now.is_some() {
        args.run_now = true;
    }

    let field_count = args.cron.split_whitespace().count();
    if !(6..=7).contains(&field_count) {
        errors.push(
            darling::Error::custom(format!(
                "cron expression `{}` must have 6 or 7 fields, found {}",
                args.cron, field_count
            ))
            .with_span(&method.sig.ident),
        );
    }

    let sig = &method.sig;
    if sig.asyncness.is_some() {
        errors.push(darling::Error::custom("job methods cannot be async").with_span(&sig.asyncness));
    }
    if !sig.generics.params.is_empty() {
        errors.push(
            darling::Error::custom("job methods cannot be generic").with_span(&sig.generics),
        );
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        Some(other) => errors.push(
            darling::Error::custom("job methods must take `&self`").with_span(other),
        ),
        None => errors.push(
            darling::Error::custom("job methods must take `&self`").with_span(&sig.ident),
        ),
    }
    let rest: Vec<&FnArg> = inputs.collect();
    if rest.len() > 1 {
        errors.push(
            darling::Error::custom("job methods take at most one `&JobContext` argument")
                .with_span(rest[1]),
        );
    }

    errors.finish_with(Some(JobMethodDef {
        ident: sig.ident.clone(),
        takes_context: rest.len() == 1,
        args,
    }))
}

fn job_method_tokens(def: &JobMethodDef) -> TokenStream2 {
    let ident = &def.ident;
    let name = ident.to_string();
    let cron = &def.args.cron;

    let mut config = quote! { ::cronhands_core::JobConfig::new(#cron) };
    if let Some(group) = &def.args.group {
        config = quote! { #config.with_group(#group) };
    }
    if !def.args.params.is_empty() {
        let params = &def.args.params;
        config = quote! { #config.with_parameters([#(#params),*]) };
    }
    if def.args.run_now {
        config = quote! { #config.with_run_immediately(true) };
    }
    if let Some(concurrent) = def.args.concurrent {
        config = quote! { #config.with_allow_concurrent(#concurrent) };
    }
    if let Some(description) = &def.args.description {
        config = quote! { #config.with_description(#description) };
    }

    let (ctx, call) = if def.takes_context {
        (quote! { ctx }, quote! { this.#ident(ctx) })
    } else {
        (quote! { _ctx }, quote! { this.#ident() })
    };

    quote! {
        ::cronhands_core::JobMethod::new(
            #name,
            #config,
            |this: &Self, #ctx: &::cronhands_core::JobContext| {
                ::cronhands_core::IntoJobResult::into_job_result(#call)
            },
        )
    }
}
