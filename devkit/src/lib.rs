/*!
# Minewatch DevKit - Mocks et fixtures pour les tests

Bibliothèque facilitant les tests du moniteur sans vrai serveur de jeu:
- Exporter `/metrics` mock (statut, latence, corps modifiables)
- Port de jeu mock pour le probe TCP
- Builder et fixtures exposition-format
- Harness qui démarre le tout
*/

pub mod metrics_stub;
pub mod fixtures;
pub mod test_utils;

pub use metrics_stub::{closed_port, MockGamePort, MockMetricsServer};
pub use fixtures::{full_server_body, full_server_body_now, ExpositionBuilder};
pub use test_utils::TestHarness;
