//! Legislative rules shared by the gateway and the scheduler
//!
//! - `types`: closed vocabularies (session and bill kinds, statuses)
//! - `workflow`: session and agenda-item status machines
//! - `voting`: roll-call tallying and quorum rules
//! - `nomenclature`: session titles and numbering counters

pub mod nomenclature;
pub mod types;
pub mod voting;
pub mod workflow;

pub use nomenclature::{
    InMemorySequenceStore, LegislaturaRef, NomenclatureService, NumberedTitle, SequenceKey,
    SequenceStore, Template,
};
pub use types::*;
pub use voting::{tally, Apuracao, QuorumTipo, ResultadoVotacao, VotoOpcao};
pub use workflow::{blocks_conclusion, PautaStatus, SessaoStatus, StatusMachine};
