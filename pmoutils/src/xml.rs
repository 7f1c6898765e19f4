//! Parsing XML et navigation par chemin.
//!
//! Fine couche au-dessus de `xmltree` : le pipeline n'a besoin que de
//! parser un buffer, descendre un chemin d'éléments (premier enfant à chaque
//! niveau), lire un texte et parcourir des frères de même nom.

use thiserror::Error;
use xmltree::{Element, XMLNode};

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("malformed XML document: {0}")]
    Malformed(String),
}

/// Parse un document complet depuis un buffer
pub fn parse_xml(bytes: &[u8]) -> Result<Element, XmlError> {
    Element::parse(bytes).map_err(|e| XmlError::Malformed(e.to_string()))
}

/// Descend `path` depuis `root` en prenant le premier enfant de chaque nom
pub fn get_path<'a>(root: &'a Element, path: &[&str]) -> Option<&'a Element> {
    path.iter()
        .try_fold(root, |current, name| current.get_child(*name))
}

/// Texte (trimé) du premier enfant `name`, `None` si l'enfant est absent.
///
/// Un enfant présent mais vide donne une chaîne vide.
pub fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent.get_child(name).map(|child| {
        child
            .get_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    })
}

/// Tous les enfants directs de `parent` nommés `name`, dans l'ordre du document
pub fn siblings<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(elem) if elem.name == name => Some(elem),
        _ => None,
    })
}
