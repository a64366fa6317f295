const BPMON_VERSION: &str = env!("CARGO_PKG_VERSION");
const BPMON_BUILD_TARGET: &str = env!("BPMON_BUILD_TARGET");
const BPMON_BUILD_PROFILE: &str = env!("BPMON_BUILD_PROFILE");

pub fn startup_message() -> String {
    format!(
        "
 ██████╗ ██████╗ ███╗   ███╗ ██████╗ ███╗   ██╗
 ██╔══██╗██╔══██╗████╗ ████║██╔═══██╗████╗  ██║
 ██████╔╝██████╔╝██╔████╔██║██║   ██║██╔██╗ ██║
 ██╔══██╗██╔═══╝ ██║╚██╔╝██║██║   ██║██║╚██╗██║
 ██████╔╝██║     ██║ ╚═╝ ██║╚██████╔╝██║ ╚████║
 ╚═════╝ ╚═╝     ╚═╝     ╚═╝ ╚═════╝ ╚═╝  ╚═══╝

 Version          : {BPMON_VERSION}
 Build Target     : {BPMON_BUILD_TARGET}
 Build Profile    : {BPMON_BUILD_PROFILE}
"
    )
}
