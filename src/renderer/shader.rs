use std::collections::HashMap;

pub const STANDARD_VERTEX: &str = "VertexShader";
pub const SHADOW_VERTEX: &str = "ShadowVertex";
pub const PIXEL_COMMON: &str = "PixelCommon";
pub const PIXEL_TRIPLANAR: &str = "TriplanarPS";
pub const PIXEL_SOLID_COLOR: &str = "SolidColorPS";
pub const PIXEL_UNLIT: &str = "UnlitPS";

const COMMON_WGSL: &str = include_str!("../shader/common.wgsl");
const LIGHTING_WGSL: &str = include_str!("../shader/lighting.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexShaderId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelShaderId(u32);

impl VertexShaderId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl PixelShaderId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexShaderKind {
    Standard,
    Shadow,
}

/// The closed set of pixel shader setups the main pass knows how to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelShaderKind {
    CommonLit,
    Triplanar,
    SolidColor,
    Unlit,
}

impl PixelShaderKind {
    /// Needs frame constants (lights, camera) and the shadow map.
    pub fn is_lit(self) -> bool {
        matches!(self, PixelShaderKind::CommonLit | PixelShaderKind::Triplanar)
    }

    /// Texture binding names in binding order.
    pub fn texture_slots(self) -> &'static [&'static str] {
        match self {
            PixelShaderKind::CommonLit => &["Albedo", "NormalMap", "RoughnessMap"],
            PixelShaderKind::Triplanar => &["Albedo"],
            PixelShaderKind::SolidColor | PixelShaderKind::Unlit => &[],
        }
    }

    /// Sampler binding names, bound after the textures.
    pub fn sampler_slots(self) -> &'static [&'static str] {
        match self {
            PixelShaderKind::CommonLit | PixelShaderKind::Triplanar => &["BasicSampler"],
            PixelShaderKind::SolidColor | PixelShaderKind::Unlit => &[],
        }
    }

    pub fn has_resources(self) -> bool {
        !self.texture_slots().is_empty() || !self.sampler_slots().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct VertexProgram {
    pub name: String,
    pub kind: VertexShaderKind,
    pub source: String,
}

#[derive(Clone, Debug)]
pub struct PixelProgram {
    pub name: String,
    pub kind: PixelShaderKind,
    pub source: String,
}

/// Shader programs interned by name. Materials refer to them by id.
#[derive(Clone, Debug)]
pub struct ShaderRegistry {
    vertex: Vec<VertexProgram>,
    pixel: Vec<PixelProgram>,
    vertex_names: HashMap<String, VertexShaderId>,
    pixel_names: HashMap<String, PixelShaderId>,
    standard_vertex: VertexShaderId,
    shadow_vertex: VertexShaderId,
    fallback_pixel: PixelShaderId,
}

impl ShaderRegistry {
    /// Registry holding the programs every frame needs: the standard and
    /// shadow vertex shaders and the unlit fallback.
    pub fn new() -> Self {
        let mut registry = Self {
            vertex: Vec::new(),
            pixel: Vec::new(),
            vertex_names: HashMap::new(),
            pixel_names: HashMap::new(),
            standard_vertex: VertexShaderId(0),
            shadow_vertex: VertexShaderId(0),
            fallback_pixel: PixelShaderId(0),
        };

        registry.standard_vertex = registry.register_vertex(
            STANDARD_VERTEX,
            VertexShaderKind::Standard,
            include_str!("../shader/vertex.wgsl"),
        );
        registry.shadow_vertex = registry.register_vertex(
            SHADOW_VERTEX,
            VertexShaderKind::Shadow,
            include_str!("../shader/shadow_vertex.wgsl"),
        );
        registry.fallback_pixel = registry.register_pixel(
            PIXEL_UNLIT,
            PixelShaderKind::Unlit,
            include_str!("../shader/unlit.wgsl"),
        );
        registry
    }

    /// [`ShaderRegistry::new`] plus the lit, triplanar and solid colour
    /// pixel shaders.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_pixel(
            PIXEL_COMMON,
            PixelShaderKind::CommonLit,
            &with_lighting(include_str!("../shader/pixel_common.wgsl")),
        );
        registry.register_pixel(
            PIXEL_SOLID_COLOR,
            PixelShaderKind::SolidColor,
            include_str!("../shader/solid_color.wgsl"),
        );
        registry.register_pixel(
            PIXEL_TRIPLANAR,
            PixelShaderKind::Triplanar,
            &with_lighting(include_str!("../shader/triplanar.wgsl")),
        );
        registry
    }

    /// Registers `body` (prefixed with the shared declarations) under
    /// `name`. Re-registering a name keeps its id and replaces the program.
    pub fn register_vertex(
        &mut self,
        name: &str,
        kind: VertexShaderKind,
        body: &str,
    ) -> VertexShaderId {
        let program = VertexProgram {
            name: name.to_owned(),
            kind,
            source: with_common(body),
        };

        if let Some(&id) = self.vertex_names.get(name) {
            log::debug!("Replacing vertex shader {name}");
            self.vertex[id.index()] = program;
            return id;
        }

        let id = VertexShaderId(self.vertex.len() as u32);
        self.vertex.push(program);
        self.vertex_names.insert(name.to_owned(), id);
        id
    }

    pub fn register_pixel(&mut self, name: &str, kind: PixelShaderKind, body: &str) -> PixelShaderId {
        let program = PixelProgram {
            name: name.to_owned(),
            kind,
            source: with_common(body),
        };

        if let Some(&id) = self.pixel_names.get(name) {
            log::debug!("Replacing pixel shader {name}");
            self.pixel[id.index()] = program;
            return id;
        }

        let id = PixelShaderId(self.pixel.len() as u32);
        self.pixel.push(program);
        self.pixel_names.insert(name.to_owned(), id);
        id
    }

    pub fn vertex_id(&self, name: &str) -> Option<VertexShaderId> {
        self.vertex_names.get(name).copied()
    }

    pub fn pixel_id(&self, name: &str) -> Option<PixelShaderId> {
        self.pixel_names.get(name).copied()
    }

    pub fn vertex(&self, id: VertexShaderId) -> Option<&VertexProgram> {
        self.vertex.get(id.index())
    }

    pub fn pixel(&self, id: PixelShaderId) -> Option<&PixelProgram> {
        self.pixel.get(id.index())
    }

    pub fn pixel_kind(&self, id: PixelShaderId) -> Option<PixelShaderKind> {
        self.pixel(id).map(|program| program.kind)
    }

    pub fn standard_vertex(&self) -> VertexShaderId {
        self.standard_vertex
    }

    pub fn shadow_vertex(&self) -> VertexShaderId {
        self.shadow_vertex
    }

    pub fn fallback_pixel(&self) -> PixelShaderId {
        self.fallback_pixel
    }

    pub fn solid_color_pixel(&self) -> Option<PixelShaderId> {
        self.pixel_id(PIXEL_SOLID_COLOR)
    }
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn with_common(body: &str) -> String {
    format!("{COMMON_WGSL}\n{body}")
}

/// Frame and material bindings plus the shading functions lit pixel
/// shaders call.
pub fn with_lighting(body: &str) -> String {
    format!("{LIGHTING_WGSL}\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_resolve() {
        let registry = ShaderRegistry::with_builtin();
        for name in [PIXEL_COMMON, PIXEL_TRIPLANAR, PIXEL_SOLID_COLOR, PIXEL_UNLIT] {
            assert!(registry.pixel_id(name).is_some(), "{name} missing");
        }
        assert_eq!(registry.vertex_id(SHADOW_VERTEX), Some(registry.shadow_vertex()));
        assert_eq!(registry.pixel_kind(registry.fallback_pixel()), Some(PixelShaderKind::Unlit));
    }

    #[test]
    fn reregistering_keeps_the_id() {
        let mut registry = ShaderRegistry::new();
        let first = registry.register_pixel("Custom", PixelShaderKind::SolidColor, "// a");
        let second = registry.register_pixel("Custom", PixelShaderKind::SolidColor, "// b");

        assert_eq!(first, second);
        let program = registry.pixel(first).expect("registered");
        assert!(program.source.ends_with("// b"));
    }

    #[test]
    fn ids_from_another_registry_may_not_resolve() {
        let small = ShaderRegistry::new();
        let big = ShaderRegistry::with_builtin();
        let triplanar = big.pixel_id(PIXEL_TRIPLANAR).expect("builtin");
        assert!(small.pixel(triplanar).is_none());
    }

    #[test]
    fn lit_kinds_need_textures() {
        assert!(PixelShaderKind::CommonLit.is_lit());
        assert!(PixelShaderKind::Triplanar.is_lit());
        assert!(!PixelShaderKind::SolidColor.is_lit());
        assert_eq!(PixelShaderKind::CommonLit.texture_slots().len(), 3);
        assert!(!PixelShaderKind::Unlit.has_resources());
    }

    #[test]
    fn sources_include_shared_declarations() {
        let registry = ShaderRegistry::with_builtin();
        let program = registry.vertex(registry.standard_vertex()).expect("builtin");
        assert!(program.source.contains("struct VertexConstants"));

        let lit = registry.pixel_id(PIXEL_COMMON).and_then(|id| registry.pixel(id)).expect("builtin");
        assert!(lit.source.contains("fn shade("));
    }
}
