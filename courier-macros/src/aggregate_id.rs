use crate::attr_args::AttrArgs;
use crate::derive_utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, parse_macro_input};

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttrArgs);
    let input = parse_macro_input!(item as Item);

    let prefix = match args.only(&["prefix"]).and_then(|_| args.lit_str("prefix")) {
        Ok(prefix) => prefix,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[aggregate_id] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let inner_ty = match &st.fields {
        syn::Fields::Unnamed(f) if f.unnamed.len() == 1 => f.unnamed[0].ty.clone(),
        syn::Fields::Unnamed(f) => {
            return syn::Error::new(
                f.span(),
                "#[aggregate_id] requires a tuple struct with exactly one field",
            )
            .to_compile_error()
            .into();
        }
        _ => {
            return syn::Error::new(
                st.span(),
                "#[aggregate_id] supports only tuple struct, e.g., struct MailboxId(String);",
            )
            .to_compile_error()
            .into();
        }
    };

    apply_derives(
        &mut st.attrs,
        vec![
            syn::parse_quote!(Clone),
            syn::parse_quote!(Debug),
            syn::parse_quote!(PartialEq),
            syn::parse_quote!(Eq),
            syn::parse_quote!(Hash),
            syn::parse_quote!(serde::Serialize),
            syn::parse_quote!(serde::Deserialize),
        ],
    );

    let key_body = match prefix {
        Some(prefix) => quote! { ::std::format!("{}-{}", #prefix, self.0) },
        None => quote! { ::std::string::ToString::to_string(&self.0) },
    };

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let out = quote! {
        #st

        impl #impl_generics #ident #ty_generics #where_clause {
            pub fn new(value: impl ::core::convert::Into<#inner_ty>) -> Self {
                Self(value.into())
            }
        }

        impl #impl_generics ::courier_events::event::AggregateId for #ident #ty_generics #where_clause {
            fn as_aggregate_key(&self) -> ::std::string::String {
                #key_body
            }
        }

        impl #impl_generics ::std::str::FromStr for #ident #ty_generics #where_clause {
            type Err = <#inner_ty as ::std::str::FromStr>::Err;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let inner: #inner_ty = s.parse()?;
                ::std::result::Result::Ok(Self(inner))
            }
        }

        impl #impl_generics ::std::fmt::Display for #ident #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl #impl_generics ::core::convert::AsRef<#inner_ty> for #ident #ty_generics #where_clause {
            fn as_ref(&self) -> &#inner_ty {
                &self.0
            }
        }

        impl #impl_generics ::core::convert::From<#inner_ty> for #ident #ty_generics #where_clause {
            fn from(value: #inner_ty) -> Self {
                Self(value)
            }
        }

        impl #impl_generics ::core::convert::From<#ident #ty_generics> for #inner_ty #where_clause {
            fn from(value: #ident #ty_generics) -> Self {
                value.0
            }
        }
    };

    TokenStream::from(out)
}
