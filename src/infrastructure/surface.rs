//! 操作入口注册表 - 基础设施层
//!
//! 一个逻辑操作可以绑定零个或多个入口（按钮）。守卫在调用时按 ActionId
//! 动态查询入口集合，所以成功提交后新出现的导出入口也会被覆盖到。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 逻辑操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Submission,
    Export,
}

impl ActionId {
    pub fn name(self) -> &'static str {
        match self {
            ActionId::Submission => "submission",
            ActionId::Export => "export",
        }
    }

    /// 进行中时入口显示的内容
    pub fn working_label(self) -> &'static str {
        match self {
            ActionId::Submission => "⏳ Processing analysis...",
            ActionId::Export => "⏳ Generating...",
        }
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 入口标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub &'static str);

impl SurfaceId {
    pub const SUBMIT: SurfaceId = SurfaceId("submit");
    /// 成功提交后出现的顶部导出按钮
    pub const EXPORT_HEADER: SurfaceId = SurfaceId("export.header");
    /// 结果区内的导出按钮
    pub const EXPORT_INLINE: SurfaceId = SurfaceId("export.inline");

    pub fn parse(name: &str) -> Option<Self> {
        [Self::SUBMIT, Self::EXPORT_HEADER, Self::EXPORT_INLINE]
            .into_iter()
            .find(|s| s.0 == name || s.0.rsplit('.').next() == Some(name))
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// 单个入口的可观察状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    pub id: SurfaceId,
    pub action: ActionId,
    /// 空闲时的默认内容
    pub label: String,
    /// 当前显示内容
    pub content: String,
    pub enabled: bool,
    pub visible: bool,
    saved_content: Option<String>,
}

impl SurfaceState {
    pub fn is_busy(&self) -> bool {
        !self.enabled
    }
}

#[derive(Debug, Default)]
struct Surfaces {
    /// 按绑定顺序保存
    entries: Vec<SurfaceState>,
    /// 正在进行中的操作及其工作内容
    busy: HashMap<ActionId, String>,
}

/// 入口注册表
///
/// 所有修改都在同一把锁内完成，同一操作的所有入口总是同时切换。
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    inner: Mutex<Surfaces>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Surfaces> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 绑定入口；已存在时保持原状并返回 false
    ///
    /// 操作进行中绑定的入口直接进入忙碌状态，与其他入口保持一致。
    pub fn bind(&self, action: ActionId, id: SurfaceId, label: impl Into<String>) -> bool {
        let mut surfaces = self.lock();
        if surfaces.entries.iter().any(|s| s.id == id) {
            return false;
        }

        let label = label.into();
        let mut state = SurfaceState {
            id,
            action,
            content: label.clone(),
            label,
            enabled: true,
            visible: false,
            saved_content: None,
        };
        if let Some(working) = surfaces.busy.get(&action) {
            state.saved_content = Some(std::mem::replace(&mut state.content, working.clone()));
            state.enabled = false;
        }
        surfaces.entries.push(state);
        true
    }

    pub fn set_visible(&self, id: SurfaceId, visible: bool) -> bool {
        let mut surfaces = self.lock();
        match surfaces.entries.iter_mut().find(|s| s.id == id) {
            Some(state) => {
                state.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn surface(&self, id: SurfaceId) -> Option<SurfaceState> {
        self.lock().entries.iter().find(|s| s.id == id).cloned()
    }

    /// 当前绑定到该操作的所有入口
    pub fn snapshot(&self, action: ActionId) -> Vec<SurfaceState> {
        self.lock()
            .entries
            .iter()
            .filter(|s| s.action == action)
            .cloned()
            .collect()
    }

    /// 同一操作的所有入口是否处于相同的忙/闲状态
    ///
    /// 只比较启用状态；忙碌时所有入口还必须显示同一工作内容。空闲时各入口的默认内容可以不同。
    pub fn is_consistent(&self, action: ActionId) -> bool {
        let surfaces = self.lock();
        let mut bound = surfaces.entries.iter().filter(|s| s.action == action);
        let Some(first) = bound.next() else {
            return true;
        };
        let working = surfaces.busy.get(&action);
        let matches_phase = |s: &SurfaceState| match working {
            Some(working) => !s.enabled && &s.content == working,
            None => s.enabled,
        };
        matches_phase(first) && bound.all(matches_phase)
    }

    /// 进入忙碌：记录每个入口当前内容，替换为工作内容并禁用
    ///
    /// 返回受影响的入口数量。
    pub fn enter_busy(&self, action: ActionId, working: &str) -> usize {
        let mut surfaces = self.lock();
        surfaces.busy.insert(action, working.to_string());
        let mut count = 0;
        for state in surfaces.entries.iter_mut().filter(|s| s.action == action) {
            if state.saved_content.is_none() {
                state.saved_content = Some(std::mem::replace(&mut state.content, working.to_string()));
            }
            state.enabled = false;
            count += 1;
        }
        count
    }

    /// 恢复：内容还原为进入忙碌前的内容（缺失时用默认内容）并重新启用
    pub fn restore(&self, action: ActionId) -> usize {
        let mut surfaces = self.lock();
        surfaces.busy.remove(&action);
        let mut count = 0;
        for state in surfaces.entries.iter_mut().filter(|s| s.action == action) {
            state.content = state
                .saved_content
                .take()
                .unwrap_or_else(|| state.label.clone());
            state.enabled = true;
            count += 1;
        }
        count
    }
}
