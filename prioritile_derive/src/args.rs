use proc_macro2::TokenStream as TokenStream2;
use syn::{
	Token,
	parse::{Parse, ParseStream},
};

/// Arguments of `#[context(...)]`: an optional `move,` followed by `format!` arguments.
#[derive(Debug)]
pub struct ContextArgs {
	pub move_token: Option<Token![move]>,
	pub message: TokenStream2,
}

impl Parse for ContextArgs {
	fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
		let move_token = if input.peek(Token![move]) {
			let token = input.parse()?;
			input.parse::<Token![,]>()?;
			Some(token)
		} else {
			None
		};
		Ok(Self {
			move_token,
			message: input.parse()?,
		})
	}
}
