/// Types which assign a display color to each vertex of a mesh.
///
/// Colors are returned as a flat vector with 3 (RGB) or 4 (RGBA) values per vertex.
pub trait VertexColor {
    fn vertex_color_rgb(&self) -> Vec<u8>;
    fn vertex_color_rgba(&self) -> Vec<u8>;
}
