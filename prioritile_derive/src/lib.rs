//! Procedural macros shared by the prioritile crates.
//!
//! The only macro exported here is [`macro@context`], which attaches a formatted message to every
//! error leaving the annotated function:
//!
//! ```ignore
//! #[context("reading tile {path:?}")]
//! async fn read(&self, path: &str) -> Result<Blob> { ... }
//! ```
//!
//! The message is only formatted on the error path. A leading `move,` moves captured arguments into
//! the wrapped body, which is needed when the format arguments are consumed by the function.

mod args;

use crate::args::ContextArgs;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{ToTokens, quote};
use syn::{ItemFn, ReturnType, parse_macro_input};

#[proc_macro_attribute]
pub fn context(args: TokenStream, input: TokenStream) -> TokenStream {
	let ContextArgs { move_token, message } = parse_macro_input!(args as ContextArgs);
	let mut function = parse_macro_input!(input as ItemFn);

	let wrapped = match wrap_body(&function, move_token.to_token_stream(), &message) {
		Ok(wrapped) => wrapped,
		Err(err) => return err.to_compile_error().into(),
	};

	function.block.stmts = vec![syn::Stmt::Expr(syn::Expr::Verbatim(wrapped), None)];
	function.into_token_stream().into()
}

fn wrap_body(function: &ItemFn, move_token: TokenStream2, message: &TokenStream2) -> syn::Result<TokenStream2> {
	let body = &function.block;
	let err = Ident::new("err", Span::mixed_site());

	let ReturnType::Type(_, return_type) = &function.sig.output else {
		return Err(syn::Error::new_spanned(
			&function.sig,
			"#[context] requires a function returning Result",
		));
	};

	if function.sig.asyncness.is_some() {
		let result = Ident::new("result", Span::mixed_site());
		Ok(quote! {
			let #result: #return_type = async #move_token { #body }.await;
			#result.map_err(|#err| #err.context(format!(#message)).into())
		})
	} else {
		// Capturing a non-`Copy` value forces the closure to be `FnOnce`.
		let once = Ident::new("once", Span::mixed_site());
		Ok(quote! {
			let #once = ::core::iter::empty::<()>();
			(#move_token || -> #return_type {
				::core::mem::drop(#once);
				#body
			})().map_err(|#err| #err.context(format!(#message)).into())
		})
	}
}
