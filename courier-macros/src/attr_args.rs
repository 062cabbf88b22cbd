use quote::ToTokens;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Ident, LitStr, Token, Type};

/// 形如 `key = value, ...` 的宏参数
pub(crate) struct AttrArgs {
    pairs: Vec<(Ident, Expr)>,
}

impl Parse for AttrArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut pairs: Vec<(Ident, Expr)> = Vec::new();

        if input.is_empty() {
            return Ok(Self { pairs });
        }

        let assigns = Punctuated::<syn::ExprAssign, Token![,]>::parse_terminated(input)?;
        for assign in assigns {
            let key = match *assign.left {
                Expr::Path(p) if p.path.segments.len() == 1 => p.path.segments[0].ident.clone(),
                other => return Err(syn::Error::new(other.span(), "invalid attribute key")),
            };
            if pairs.iter().any(|(k, _)| *k == key) {
                return Err(syn::Error::new(
                    key.span(),
                    format!("duplicate key '{key}' in attribute"),
                ));
            }
            pairs.push((key, *assign.right));
        }

        Ok(Self { pairs })
    }
}

impl AttrArgs {
    /// 拒绝不在 `allowed` 中的键
    pub(crate) fn only(&self, allowed: &[&str]) -> syn::Result<()> {
        for (key, _) in &self.pairs {
            if !allowed.iter().any(|a| key == a) {
                return Err(syn::Error::new(
                    key.span(),
                    format!("unknown key; expected {}", allowed.join(" | ")),
                ));
            }
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&Expr> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub(crate) fn lit_str(&self, key: &str) -> syn::Result<Option<LitStr>> {
        match self.get(key) {
            None => Ok(None),
            Some(Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            })) => Ok(Some(lit.clone())),
            Some(other) => Err(syn::Error::new(
                other.span(),
                format!("expected string literal for '{key}'"),
            )),
        }
    }

    pub(crate) fn ty(&self, key: &str) -> syn::Result<Option<Type>> {
        self.get(key)
            .map(|expr| syn::parse2::<Type>(expr.to_token_stream()))
            .transpose()
    }
}
