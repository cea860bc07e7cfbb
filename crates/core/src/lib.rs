pub mod event;
pub mod task {
    pub mod context;
    pub mod runner;
    pub mod generate {
        pub mod config;
        pub mod subscriber;
    }
    pub mod filter {
        pub mod config;
        pub mod processor;
    }
    pub mod map {
        pub mod config;
        pub mod processor;
    }
    pub mod convert {
        pub mod config;
        pub mod processor;
    }
    pub mod log {
        pub mod config;
        pub mod processor;
    }
}
