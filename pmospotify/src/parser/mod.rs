//! Parseurs d'étape.
//!
//! Fonctions pures `octets -> plan` : elles valident la structure de la
//! réponse (XML, chemins obligatoires, identifiants) sans toucher au cache.
//! Les champs des entités restent dans leurs noeuds XML : la
//! [`crate::session::Session`] ne les extrait que pour les entités pas
//! encore chargées, et seulement si toutes les extractions réussissent avant
//! de modifier le cache.

mod browse;
mod items;
mod search;

pub use browse::{BrowsePlan, parse_browse};
pub use items::{ITEMS_PATH, parse_container, parse_playlist};
pub use search::{SearchPlan, parse_search};
