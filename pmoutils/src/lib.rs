//! Utilitaires bas niveau partagés par les crates PMO.
//!
//! - [`hexid`] : conversion d'identifiants binaires à largeur fixe depuis/vers l'hexadécimal
//! - [`inflate`] : décompression des réponses gzip / deflate
//! - [`xml`] : parsing XML et navigation par chemin dans l'arbre
//!
//! Toutes les fonctions sont pures et faillibles : elles ne journalisent rien
//! de plus qu'une trace de debug et laissent l'appelant décider de la politique
//! d'erreur.

pub mod hexid;
pub mod inflate;
pub mod xml;

pub use hexid::{HexIdError, bytes_to_hex, hex_to_bytes};
pub use inflate::{InflateError, inflate};
pub use xml::{XmlError, child_text, get_path, parse_xml, siblings};
