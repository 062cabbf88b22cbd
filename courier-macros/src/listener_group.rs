use crate::attr_args::AttrArgs;
use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Item, parse_macro_input};

pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AttrArgs);
    let input = parse_macro_input!(item as Item);

    let st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[listener_group] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let parsed = args
        .only(&["name", "event"])
        .and_then(|_| Ok((args.lit_str("name")?, args.ty("event")?)));
    let (name, event_ty) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => return err.to_compile_error().into(),
    };

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();

    let name_expr = match name {
        Some(name) => {
            if name.value().trim().is_empty() {
                return syn::Error::new(name.span(), "group name must not be empty")
                    .to_compile_error()
                    .into();
            }
            quote! { #name }
        }
        None => quote! { ::core::concat!(::core::module_path!(), "::", ::core::stringify!(#ident)) },
    };

    let group_listener_impl = event_ty.map(|event_ty| {
        quote! {
            impl #impl_generics ::courier_events::eventing::GroupEventListener<#event_ty>
                for #ident #ty_generics #where_clause
            {
                fn default_group(&self) -> ::courier_events::routing::Group {
                    Self::group()
                }
            }
        }
    });

    let out = quote! {
        #st

        impl #impl_generics #ident #ty_generics #where_clause {
            /// 分组名
            pub const GROUP_NAME: &'static str = #name_expr;

            pub fn group() -> ::courier_events::routing::Group {
                ::courier_events::routing::Group::new(Self::GROUP_NAME)
            }
        }

        #group_listener_impl
    };

    TokenStream::from(out)
}
