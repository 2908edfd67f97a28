pub mod graph {
    pub use ard_shader_graph::*;
}

pub mod gen {
    pub use ard_shader_gen::*;
}

pub mod log {
    pub use ard_log::*;
}

pub mod prelude {
    pub use ard_shader_gen::prelude::*;
    pub use ard_shader_graph::prelude::*;
}
