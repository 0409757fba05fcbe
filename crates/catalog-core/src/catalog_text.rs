//! Canonical text of a product: the unit that gets embedded and stored as
//! payload in the vector index.

use std::collections::HashMap;

use crate::error::Result;
use crate::traits::AttributeStore;
use crate::types::{
    IndexPayload, PredefinedProductAttributeValue, Product, ProductAttribute, ProductAttributeMapping,
    ProductSpecificationAttribute, SpecificationAttribute, SpecificationAttributeOption,
};

/// Specification and product-attribute dictionaries, loaded once per
/// indexing run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct AttributeLookup {
    pub spec_attributes: HashMap<u32, SpecificationAttribute>,
    pub spec_options: HashMap<u32, SpecificationAttributeOption>,
    pub product_attributes: HashMap<u32, ProductAttribute>,
    pub predefined_values: HashMap<u32, PredefinedProductAttributeValue>,
}

impl AttributeLookup {
    pub async fn preload(store: &dyn AttributeStore) -> Result<Self> {
        let mut lookup = Self::default();
        for attr in store.specification_attributes().await? {
            for opt in store.specification_options(attr.id).await? {
                lookup.spec_options.insert(opt.id, opt);
            }
            lookup.spec_attributes.insert(attr.id, attr);
        }
        for attr in store.product_attributes().await? {
            for value in store.predefined_values(attr.id).await? {
                lookup.predefined_values.insert(value.id, value);
            }
            lookup.product_attributes.insert(attr.id, attr);
        }
        Ok(lookup)
    }

    /// `"{attribute}: {value}"` for a specification assignment; the custom
    /// value wins over the option's name when present.
    fn specification_line(&self, mapping: &ProductSpecificationAttribute) -> Option<String> {
        let opt = self.spec_options.get(&mapping.option_id)?;
        let attr = self.spec_attributes.get(&opt.specification_attribute_id)?;
        let value = match mapping.custom_value.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => custom,
            _ => opt.name.as_str(),
        };
        Some(format!("{}: {}", attr.name, value))
    }

    /// `"{attribute}: v1, v2"` for a product attribute mapping; None when no
    /// selected value resolves to a non-blank name.
    fn attribute_line(&self, mapping: &ProductAttributeMapping) -> Option<String> {
        let attr = self.product_attributes.get(&mapping.product_attribute_id)?;
        let names: Vec<&str> = mapping
            .values
            .iter()
            .map(|v| match self.predefined_values.get(&v.id) {
                Some(pv) if v.id > 0 => pv.name.as_str(),
                _ => v.name.as_str(),
            })
            .filter(|n| !n.trim().is_empty())
            .collect();
        if names.is_empty() { return None; }
        Some(format!("{}: {}", attr.name, names.join(", ")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogText {
    pub text: String,
    pub specifications: Vec<String>,
    pub attributes: Vec<String>,
}

impl CatalogText {
    pub fn is_blank(&self) -> bool { self.text.trim().is_empty() }

    /// Payload stored next to the vector.
    pub fn into_payload(self, product: &Product) -> IndexPayload {
        let description = format!("{} {}", product.short_description, product.full_description).trim().to_string();
        IndexPayload {
            name: product.name.clone(),
            description,
            specifications: self.specifications,
            attributes: self.attributes,
            text: self.text,
        }
    }
}

/// Build the canonical text: name, short and full description, then
/// specification lines, then attribute lines, space separated and trimmed.
pub fn build_catalog_text(
    product: &Product,
    specifications: &[ProductSpecificationAttribute],
    attribute_mappings: &[ProductAttributeMapping],
    lookup: &AttributeLookup,
) -> CatalogText {
    let mut parts: Vec<String> = Vec::new();
    for field in [&product.name, &product.short_description, &product.full_description] {
        if !field.trim().is_empty() { parts.push(field.trim().to_string()); }
    }
    let spec_lines: Vec<String> = specifications.iter().filter_map(|m| lookup.specification_line(m)).collect();
    let attr_lines: Vec<String> = attribute_mappings.iter().filter_map(|m| lookup.attribute_line(m)).collect();
    parts.extend(spec_lines.iter().cloned());
    parts.extend(attr_lines.iter().cloned());
    CatalogText { text: parts.join(" ").trim().to_string(), specifications: spec_lines, attributes: attr_lines }
}
