use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ItemFn, Pat, Type, parse_macro_input, spanned::Spanned};

/// Derive a `TemplateFunction` implementation from a plain function.
///
/// Each parameter becomes one positional operand, in order, and the
/// generated function accepts exactly that many operands. Operands are
/// evaluated and converted before the body runs.
///
/// # Attribute syntax
///
/// ```ignore
/// #[template_function(name = "pad")]
/// ```
///
/// # Supported parameter types
/// - `String` — the operand's text
/// - `i64` — the operand parsed as an integer (`TypeMismatch` otherwise)
/// - `f64` — the operand parsed as a number (`TypeMismatch` otherwise)
/// - `bool` — the operand's truthiness (non-empty text is `true`)
///
/// The function must return `Result<String, EvalError>`.
///
/// # Example
/// ```ignore
/// #[template_function(name = "pad")]
/// fn pad_number(n: i64, width: i64) -> Result<String, EvalError> {
///     Ok(format!("{n:0width$}", width = width.max(0) as usize))
/// }
///
/// registry.register(PadNumberFunction);
/// ```
#[proc_macro_attribute]
pub fn template_function(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as FunctionArgs);
    let input_fn = parse_macro_input!(item as ItemFn);

    match expand(&args, &input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &FunctionArgs, input_fn: &ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let fn_name = &input_fn.sig.ident;
    let struct_name = format_ident!("{}Function", to_pascal_case(&fn_name.to_string()));
    let template_name = &args.name;

    let mut param_extractions = Vec::new();
    let mut param_names = Vec::new();
    let mut param_types = Vec::new();

    for (index, fn_arg) in input_fn.sig.inputs.iter().enumerate() {
        let FnArg::Typed(pat_type) = fn_arg else {
            return Err(syn::Error::new(
                fn_arg.span(),
                "template functions cannot take `self`",
            ));
        };
        let Pat::Ident(ident) = &*pat_type.pat else {
            return Err(syn::Error::new(
                pat_type.pat.span(),
                "expected a plain parameter name",
            ));
        };

        let param_name = &ident.ident;
        let ty = &*pat_type.ty;
        param_extractions.push(generate_extraction(param_name, ty, index)?);
        param_names.push(param_name.clone());
        param_types.push(ty.clone());
    }

    let arity = param_names.len();
    let fn_body = &input_fn.block;

    Ok(quote! {
        pub struct #struct_name;

        impl #struct_name {
            fn execute(#(#param_names: #param_types),*) -> Result<String, trackfmt::EvalError> {
                #fn_body
            }
        }

        impl trackfmt::TemplateFunction for #struct_name {
            fn call(
                &self,
                __trackfmt_args: &trackfmt::Args<'_, '_>,
            ) -> Result<String, trackfmt::EvalError> {
                #(#param_extractions)*
                Self::execute(#(#param_names),*)
            }

            fn signature(&self) -> trackfmt::Signature {
                trackfmt::Signature::new(#template_name, trackfmt::Arity::Exact(#arity))
            }
        }
    })
}

/// Generate the operand conversion for one positional parameter.
///
/// The operand view is bound as `__trackfmt_args` so that no parameter
/// name can shadow it.
fn generate_extraction(
    ident: &syn::Ident,
    ty: &Type,
    index: usize,
) -> syn::Result<proc_macro2::TokenStream> {
    let type_str = quote!(#ty).to_string().replace(' ', "");

    let accessor = match type_str.as_str() {
        "String" => quote! { text },
        "i64" => quote! { integer },
        "f64" => quote! { float },
        "bool" => quote! { is_true },
        other => {
            return Err(syn::Error::new(
                ty.span(),
                format!("unsupported parameter type `{other}`, expected String, i64, f64 or bool"),
            ));
        }
    };

    Ok(quote! {
        let #ident = __trackfmt_args.#accessor(#index)?;
    })
}

fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

// -- Attribute arg parsing -----------------------------------------------

struct FunctionArgs {
    name: String,
}

impl syn::parse::Parse for FunctionArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let ident: syn::Ident = input.parse()?;
        if ident != "name" {
            return Err(syn::Error::new(ident.span(), "expected `name`"));
        }
        input.parse::<syn::Token![=]>()?;
        let lit: syn::LitStr = input.parse()?;

        let name = lit.value();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(syn::Error::new(
                lit.span(),
                "function names may only contain letters, digits and '_'",
            ));
        }
        Ok(FunctionArgs { name })
    }
}
