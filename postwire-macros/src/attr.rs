use syn::{Field, LitStr, Result};

/// Field attribute, `#[postwire(rename = "column")]`.
#[derive(Default)]
pub struct FieldAttr {
    pub rename: Option<String>,
}

impl FieldAttr {
    pub fn from_field(field: &Field) -> Result<FieldAttr> {
        let mut attr = FieldAttr::default();

        for a in field.attrs.iter().filter(|a| a.path().is_ident("postwire")) {
            a.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    attr.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    return Ok(());
                }
                Err(meta.error("unknown attribute, expected `rename`"))
            })?;
        }

        Ok(attr)
    }

    /// Column or record field name.
    pub fn name(&self, field: &Field) -> String {
        match (&self.rename, &field.ident) {
            (Some(rename), _) => rename.clone(),
            (None, Some(ident)) => ident.to_string().trim_start_matches("r#").to_owned(),
            (None, None) => String::new(),
        }
    }
}
