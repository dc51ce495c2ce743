// Application layer: one pipeline per stage, wired to the ports in `domain`.

pub mod pipelines;
