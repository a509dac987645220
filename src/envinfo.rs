use crate::nvm::parser::{describe_node_arch, normalize_version, parse_proxy, parse_root_path};
use crate::nvm::{Arch, NodeVersionManager, NvmStatus};

/// Node 环境信息，显示在首页和设置页
#[derive(Debug, Clone)]
pub struct EnvInfo {
    pub nvm: NvmStatus,
    pub node_version: Option<String>,
    pub npm_version: Option<String>,
    pub node_arch: Option<String>,
    pub root: Option<String>,
    pub proxy: Option<String>,
    pub default_arch: Arch,
}

impl EnvInfo {
    /// 并发查询各项信息，单项失败只留空
    pub async fn detect(nvm: &NodeVersionManager) -> Self {
        let (status, current, npm, node_arch, root, proxy, arch) = tokio::join!(
            nvm.check_installation(),
            nvm.current(),
            nvm.npm_version(),
            nvm.node_arch(),
            nvm.root(),
            nvm.proxy(),
            nvm.arch(),
        );

        Self {
            nvm: status,
            node_version: current
                .into_output()
                .ok()
                .map(|o| normalize_version(&o))
                .filter(|v| !v.is_empty()),
            npm_version: npm
                .into_output()
                .ok()
                .map(|o| normalize_version(&o))
                .filter(|v| !v.is_empty()),
            node_arch: node_arch.into_output().ok().map(|o| describe_node_arch(&o)),
            root: root.into_output().ok().and_then(|o| parse_root_path(&o)),
            proxy: proxy.into_output().ok().and_then(|o| parse_proxy(&o)),
            default_arch: arch
                .into_output()
                .map(|o| Arch::from_output(&o))
                .unwrap_or(Arch::Unknown),
        }
    }
}
